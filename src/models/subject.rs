use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
}

/// Catalog order defines the spreadsheet column of every subject; reordering
/// it remaps existing sheet data.
pub const SUBJECTS: [Subject; 17] = [
    Subject { id: "bel_lang", name: "Бел. яз." },
    Subject { id: "bel_lit", name: "Бел. лит." },
    Subject { id: "rus_lang", name: "Русск. яз." },
    Subject { id: "rus_lit", name: "Русск. лит." },
    Subject { id: "foreign_lang", name: "Ин. яз." },
    Subject { id: "math", name: "Математика" },
    Subject { id: "informatics", name: "Информатика" },
    Subject { id: "world_history", name: "Всем. истор." },
    Subject { id: "bel_history", name: "Истор. Бел." },
    Subject { id: "social_studies", name: "Обществов." },
    Subject { id: "geography", name: "География" },
    Subject { id: "biology", name: "Биология" },
    Subject { id: "physics", name: "Физика" },
    Subject { id: "astronomy", name: "Астрономия" },
    Subject { id: "chemistry", name: "Химия" },
    Subject { id: "physical_edu", name: "Физ-ра" },
    Subject { id: "dp_mp", name: "ДП/МП" },
];

/// Columns A-C hold last name, first name and an unused slot.
pub const FIRST_SUBJECT_COLUMN: usize = 3;

pub fn subject_index(id: &str) -> Option<usize> {
    SUBJECTS.iter().position(|s| s.id == id)
}

pub fn subject_by_name(name: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.name == name)
}

/// 0-based sheet column holding the subject at catalog index `index`.
pub fn subject_column(index: usize) -> usize {
    index + FIRST_SUBJECT_COLUMN
}
