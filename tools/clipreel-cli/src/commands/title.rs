//! Preview title bumper substitution.

use clipreel_common::config::AppConfig;
use clipreel_common::counter::CompilationCounter;
use clipreel_compilation_model::substitute_title;

pub fn run(
    config: &AppConfig,
    template: String,
    number: Option<u64>,
    game: Option<String>,
) -> anyhow::Result<()> {
    let number =
        number.unwrap_or_else(|| CompilationCounter::new(&config.paths.counter_file).current() + 1);
    let game = game.or_else(|| config.compilation.game_name.clone());

    let title = substitute_title(&template, number, game.as_deref());
    if title.is_empty() {
        anyhow::bail!("Template {template:?} is empty after substitution");
    }
    println!("{title}");
    Ok(())
}
