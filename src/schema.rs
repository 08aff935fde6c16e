use teloxide::{
    dispatching::{UpdateFilterExt, UpdateHandler},
    dptree,
    types::Update,
};

use crate::{
    catalog::SheetSource,
    commands::{help, invalid_input, start, Command},
    runner::{start_quiz, take_answer},
};

/// Dispatch tree: commands and stray messages, then answer buttons.
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Quiz].endpoint(start_quiz::<SheetSource>));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .endpoint(invalid_input);

    let callback_handler = Update::filter_callback_query().endpoint(take_answer);

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}
