use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{Message, ParseMode},
    utils::command::BotCommands,
    Bot,
};
use tracing::instrument;

use crate::HandlerResult;

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "welcome message.")]
    Start,
    #[command(description = "show this help.")]
    Help,
    #[command(description = "start a multiple choice quiz.")]
    Quiz,
}

pub const WELCOME_TEXT: &str =
    "👋 Hi! I'm your English Study Bot.\nUse /help to see what I can do.";

pub fn help_text() -> String {
    format!(
        "📚 <b>English Bot Help</b>\n\n\
         {}\n\n\
         👉 In quiz mode:\n\
         - I'll show you a random <b>phrasal verb or vocab</b>.\n\
         - You pick the correct meaning from the options.\n\
         - I'll tell you if you're right ✅ or wrong ❌.\n\
         - Press 🛑 Stop Quiz at any time to see your score.",
        Command::descriptions()
    )
}

#[instrument(level = "info", skip(bot))]
pub(crate) async fn start(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
    Ok(())
}

#[instrument(level = "info", skip(bot))]
pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, help_text())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(bot))]
pub(crate) async fn invalid_input(bot: Bot, msg: Message) -> HandlerResult {
    log::info!("Unhandled message {:?} in chat {}", msg.text(), msg.chat.id);
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}
