use std::sync::Arc;

use rand::Rng;
use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, ParseMode, UserId},
    utils::html,
    Bot,
};
use tracing::instrument;

use crate::{
    catalog::{Catalog, CatalogCache, CatalogSource},
    config::Config,
    keyboard::question_keyboard,
    question::{RenderedQuestion, STOP_CALLBACK},
    session::{
        answer_and_advance, next_question, start_session, stop_session, AnswerOutcome, Progress,
        ScoreSummary, SessionState,
    },
    HandlerResult, Sessions,
};

pub const NO_ACTIVE_QUIZ_TEXT: &str = "No active quiz. Send /quiz to start one.";

pub fn feedback_text(outcome: &AnswerOutcome) -> String {
    let word = html::bold(&html::escape(&outcome.word));
    let meaning = html::escape(&outcome.correct_meaning);
    if outcome.is_correct {
        format!("✅ Correct!\n\n👉 {word}\nMeaning: {meaning}")
    } else {
        format!("❌ Wrong!\n\n👉 {word}\nCorrect meaning: {meaning}")
    }
}

pub fn finished_text(feedback: &str, summary: ScoreSummary) -> String {
    format!(
        "{feedback}\n\n🏁 Quiz finished!\nYour score: {}/{}",
        summary.score, summary.total
    )
}

pub fn stopped_text(summary: ScoreSummary) -> String {
    format!(
        "🛑 Quiz stopped.\nYour score so far: {}/{}",
        summary.score, summary.total
    )
}

fn begin(catalog: &Catalog, pool_size: usize) -> (SessionState, Option<RenderedQuestion>) {
    let mut rng = rand::thread_rng();
    let mut session = start_session(catalog, pool_size, &mut rng);
    let question = next_question(&mut session, &mut rng);
    (session, question)
}

#[instrument(level = "info", skip(bot, cache, sessions, config))]
pub(crate) async fn start_quiz<Source: CatalogSource + 'static>(
    bot: Bot,
    msg: Message,
    cache: Arc<CatalogCache<Source>>,
    sessions: Arc<Sessions>,
    config: Arc<Config>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        log::info!("Ignoring /quiz without a sender in chat {}", msg.chat.id);
        return Ok(());
    };

    let catalog = match cache.get().await {
        Ok(catalog) => catalog,
        Err(e) => {
            log::error!("Failed to load word list: {}", e);
            bot.send_message(
                msg.chat.id,
                "Sorry, I couldn't load the word list. Please try again later.",
            )
            .await?;
            return Err(e.into());
        }
    };

    let (session, question) = begin(&catalog, config.questions_per_cycle);
    log::info!(
        "User {} starts a quiz with {} questions",
        user.id,
        session.pool().len()
    );
    sessions.put(user.id, session);

    match question {
        Some(question) => {
            bot.send_message(msg.chat.id, question.text)
                .reply_markup(question_keyboard(&question.keyboard))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        None => {
            bot.send_message(msg.chat.id, "The word list is empty. Nothing to ask yet.")
                .await?;
        }
    }

    Ok(())
}

/// What a button press leads to, decided before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackReply {
    NoActiveQuiz,
    Stopped(String),
    Next {
        feedback: String,
        question: RenderedQuestion,
    },
    Finished(String),
}

/// Applies a pressed button to the user's session.
pub fn apply_callback<R: Rng + ?Sized>(
    sessions: &Sessions,
    user_id: UserId,
    data: &str,
    rng: &mut R,
) -> CallbackReply {
    if data == STOP_CALLBACK {
        return match sessions.update(&user_id, stop_session) {
            Some(Ok(summary)) => {
                log::info!(
                    "User {} stops the quiz at {}/{}",
                    user_id,
                    summary.score,
                    summary.total
                );
                CallbackReply::Stopped(stopped_text(summary))
            }
            _ => CallbackReply::NoActiveQuiz,
        };
    }

    let report = sessions.update(&user_id, |session| answer_and_advance(session, data, rng));
    let report = match report {
        Some(Ok(report)) => report,
        _ => return CallbackReply::NoActiveQuiz,
    };
    log::info!(
        "User {} answers {} for '{}'. Correctness: {}",
        user_id,
        data,
        report.outcome.word,
        report.outcome.is_correct
    );

    let feedback = feedback_text(&report.outcome);
    match report.progress {
        Progress::Next(question) => CallbackReply::Next { feedback, question },
        Progress::Finished(summary) => {
            log::info!(
                "User {} completed the quiz with {}/{}",
                user_id,
                summary.score,
                summary.total
            );
            CallbackReply::Finished(finished_text(&feedback, summary))
        }
    }
}

#[instrument(
    level = "info",
    skip(bot, q, sessions),
    fields(user = %q.from.id, data = ?q.data)
)]
pub(crate) async fn take_answer(
    bot: Bot,
    q: CallbackQuery,
    sessions: Arc<Sessions>,
) -> HandlerResult {
    let Some(data) = q.data.as_deref() else {
        acknowledge(&bot, &q, None).await;
        return Ok(());
    };
    let reply = apply_callback(&sessions, q.from.id, data, &mut rand::thread_rng());

    match reply {
        CallbackReply::NoActiveQuiz => {
            log::info!("User {} pressed {:?} without an active quiz", q.from.id, q.data);
            acknowledge(&bot, &q, Some(NO_ACTIVE_QUIZ_TEXT)).await;
        }
        CallbackReply::Stopped(text) | CallbackReply::Finished(text) => {
            acknowledge(&bot, &q, None).await;
            replace_question(&bot, &q, text).await?;
        }
        CallbackReply::Next { feedback, question } => {
            acknowledge(&bot, &q, None).await;
            replace_question(&bot, &q, feedback).await?;
            bot.send_message(chat_of(&q), question.text)
                .reply_markup(question_keyboard(&question.keyboard))
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

/// Clears the button spinner. The session has already moved on, so a
/// rejected acknowledgement must not keep the reply from going out.
async fn acknowledge(bot: &Bot, q: &CallbackQuery, notice: Option<&str>) {
    let mut request = bot.answer_callback_query(&q.id);
    if let Some(notice) = notice {
        request = request.text(notice);
    }
    if let Err(e) = request.await {
        log::warn!("Failed to answer callback query from {}: {}", q.from.id, e);
    }
}

fn chat_of(q: &CallbackQuery) -> ChatId {
    q.chat_id().unwrap_or(ChatId(q.from.id.0 as i64))
}

/// Swaps the answered question for `text`, dropping its keyboard.
async fn replace_question(bot: &Bot, q: &CallbackQuery, text: String) -> HandlerResult {
    match &q.message {
        Some(message) => {
            bot.edit_message_text(chat_of(q), message.id(), text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        None => {
            bot.send_message(chat_of(q), text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }
    Ok(())
}
