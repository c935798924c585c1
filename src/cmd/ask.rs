//! Question command — `hitl ask`.

use anyhow::Result;

use hitl::questions::{Question, TerminalAsker, ask_until_answered};

pub async fn cmd_ask(
    id: &str,
    prompt: &str,
    options: &[String],
    multi: bool,
    allow_defer: bool,
) -> Result<()> {
    let question = match (options.is_empty(), multi) {
        (true, _) => Question::text(id, prompt),
        (false, false) => Question::single(id, prompt, options.to_vec()),
        (false, true) => Question::multi(id, prompt, options.to_vec()),
    };

    let answers = ask_until_answered(&TerminalAsker, &[question], allow_defer).await?;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}
