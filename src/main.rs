mod app;
mod model;
mod services;
mod sketch_core;
mod theme;
mod ui;
mod widgets;

use anyhow::Result;

fn main() -> Result<()> {
    ui::run()
}
