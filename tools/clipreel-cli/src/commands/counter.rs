//! Show or bump the compilation counter.

use clipreel_common::config::AppConfig;
use clipreel_common::counter::CompilationCounter;

pub fn run(config: &AppConfig, increment: bool) -> anyhow::Result<()> {
    let counter = CompilationCounter::new(&config.paths.counter_file);
    let value = if increment {
        counter.increment()
    } else {
        counter.current()
    };
    println!("{value}");
    Ok(())
}
