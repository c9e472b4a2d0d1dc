use chrono::Local;
use colored::*;
use padfields::config::FieldsConfig;
use padfields::model::Note;
use padfields::FormField;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TYPE_WIDTH: usize = 12;
const LABEL_WIDTH: usize = 24;

/// A placeholder `check` could not make sense of.
pub struct Problem {
    pub index: usize,
    pub placeholder: String,
    pub reason: String,
}

pub fn print_expanded(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

pub fn print_fields(fields: &[(FormField, Option<String>)]) {
    if fields.is_empty() {
        println!("No fields found.");
        return;
    }

    for (form_field, value) in fields {
        let field = &form_field.field;
        let idx_str = format!("{:>3}. ", form_field.index + 1);
        let type_str = pad_to_width(&truncate_to_width(field.type_id(), TYPE_WIDTH), TYPE_WIDTH);

        let mut label = field.label();
        if field.meta().required {
            label.push('*');
        }
        let label_str = pad_to_width(&truncate_to_width(&label, LABEL_WIDTH), LABEL_WIDTH);

        let available = LINE_WIDTH.saturating_sub(idx_str.width() + TYPE_WIDTH + LABEL_WIDTH + 2);
        let value_str = match value {
            Some(value) => truncate_to_width(&value.replace('\n', "⏎"), available).normal(),
            None => "(no value)".dimmed(),
        };

        let type_colored = if field.is_unknown() {
            type_str.red()
        } else if field.is_user_input() {
            type_str.cyan()
        } else {
            type_str.normal()
        };

        println!("{}{} {} {}", idx_str, type_colored, label_str, value_str);
    }
}

pub fn print_problems(problems: &[Problem]) {
    if problems.is_empty() {
        println!("{}", "All placeholders are understood.".green());
        return;
    }
    for problem in problems {
        println!(
            "{:>3}. {} {}",
            problem.index + 1,
            problem.placeholder.yellow(),
            problem.reason.dimmed()
        );
    }
}

pub fn print_notes(notes: &[Note]) {
    if notes.is_empty() {
        println!("No notes found.");
        return;
    }

    let id_width = notes
        .iter()
        .map(|n| n.metadata.id.width())
        .max()
        .unwrap_or(0);

    for note in notes {
        let created = note
            .metadata
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let marker = if note.metadata.expand_allowed { " " } else { "=" };
        let available = LINE_WIDTH.saturating_sub(id_width + created.width() + 6);
        println!(
            "{} {} {}  {}",
            pad_to_width(&note.metadata.id, id_width).yellow(),
            marker.dimmed(),
            pad_to_width(&truncate_to_width(&note.metadata.title, available), available),
            created.dimmed()
        );
    }
}

pub fn print_config(config: &FieldsConfig) {
    for key in FieldsConfig::KEYS {
        if let Some(value) = config.get(key) {
            println!("{} = {}", key, value);
        }
    }
}

fn pad_to_width(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}
