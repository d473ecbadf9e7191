//! Presentation of command suggestions and selection of one of them.

use crate::core_types::CommandSuggestion;
use crate::errors::AssistantError;
use crate::terminal::Terminal;

/// Shows suggestions to the human and returns the chosen command.
///
/// `None` means the user cancelled; that is a normal outcome, not an error.
pub trait SuggestionPresenter {
    fn present(
        &mut self,
        suggestions: &[CommandSuggestion],
        terminal: &mut dyn Terminal,
    ) -> Result<Option<String>, AssistantError>;
}

/// Numbered table followed by a cancel option and a selection prompt.
#[derive(Debug, Clone, Default)]
pub struct NumberedPresenter;

impl NumberedPresenter {
    pub fn new() -> Self {
        Self
    }

    fn render_table(suggestions: &[CommandSuggestion]) -> Vec<String> {
        let rows: Vec<[String; 4]> = suggestions
            .iter()
            .enumerate()
            .map(|(idx, s)| {
                [
                    (idx + 1).to_string(),
                    s.command.clone(),
                    s.safety_level.as_str().to_string(),
                    s.description.clone(),
                ]
            })
            .collect();

        let header = ["#", "Command", "Safety", "Description"].map(String::from);
        let mut widths = header.clone().map(|h| h.chars().count());
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        std::iter::once(&header)
            .chain(rows.iter())
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .zip(widths.iter())
                    .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                    .collect();
                cells.join("  ").trim_end().to_string()
            })
            .collect()
    }
}

impl SuggestionPresenter for NumberedPresenter {
    fn present(
        &mut self,
        suggestions: &[CommandSuggestion],
        terminal: &mut dyn Terminal,
    ) -> Result<Option<String>, AssistantError> {
        terminal.write_line("")?;
        for line in Self::render_table(suggestions) {
            terminal.write_line(&line)?;
        }
        terminal.write_line("")?;

        let cancel = suggestions.len() + 1;
        terminal.write_line(&format!("{}: Cancel - don't execute any command", cancel))?;
        terminal.write_line("")?;

        loop {
            let Some(input) = terminal.read_line("Select a command [1]: ")? else {
                return Ok(None);
            };
            let input = input.trim();
            let input = if input.is_empty() { "1" } else { input };

            match input.parse::<usize>() {
                Ok(choice) if (1..=suggestions.len()).contains(&choice) => {
                    return Ok(Some(suggestions[choice - 1].command.clone()));
                }
                Ok(choice) if choice == cancel => return Ok(None),
                Ok(_) => terminal.write_line("Invalid choice. Please try again.")?,
                Err(_) => terminal.write_line("Please enter a valid number.")?,
            }
        }
    }
}

/// Presenter returning scripted selections, for tests.
#[cfg(test)]
pub struct MockPresenter {
    selections: Vec<Option<String>>,
    pub presented: Vec<Vec<CommandSuggestion>>,
}

#[cfg(test)]
impl MockPresenter {
    pub fn new(mut selections: Vec<Option<String>>) -> Self {
        selections.reverse();
        Self {
            selections,
            presented: Vec::new(),
        }
    }
}

#[cfg(test)]
impl SuggestionPresenter for MockPresenter {
    fn present(
        &mut self,
        suggestions: &[CommandSuggestion],
        _terminal: &mut dyn Terminal,
    ) -> Result<Option<String>, AssistantError> {
        self.presented.push(suggestions.to_vec());
        Ok(self.selections.pop().flatten())
    }
}
