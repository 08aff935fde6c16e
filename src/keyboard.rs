use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::question::KeyboardChoice;

/// One button per row: every answer label, then the stop button.
pub(crate) fn question_keyboard(choices: &[KeyboardChoice]) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = choices
        .iter()
        .map(|choice| vec![InlineKeyboardButton::callback(choice.text(), choice.callback_data())])
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;
    use crate::question::STOP_CALLBACK;

    #[test]
    fn one_row_per_choice_with_stop_last() {
        let choices = vec![
            KeyboardChoice::Answer {
                label: "A".to_owned(),
            },
            KeyboardChoice::Answer {
                label: "B".to_owned(),
            },
            KeyboardChoice::Stop,
        ];

        let markup = question_keyboard(&choices);
        let rows: Vec<(String, InlineKeyboardButtonKind)> = markup
            .inline_keyboard
            .iter()
            .map(|row| {
                assert_eq!(row.len(), 1);
                (row[0].text.clone(), row[0].kind.clone())
            })
            .collect();

        assert_eq!(
            rows,
            vec![
                ("A".to_owned(), InlineKeyboardButtonKind::CallbackData("A".to_owned())),
                ("B".to_owned(), InlineKeyboardButtonKind::CallbackData("B".to_owned())),
                (
                    "🛑 Stop Quiz".to_owned(),
                    InlineKeyboardButtonKind::CallbackData(STOP_CALLBACK.to_owned())
                ),
            ]
        );
    }
}
