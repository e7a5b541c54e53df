use subtle::ConstantTimeEq;

use crate::models::user::{Role, User};

const STUDENT_PASSWORD: &str = "password";
const DEFAULT_CLASS: &str = "11";

const STUDENTS: [(&str, &str); 27] = [
    ("biryuk", "Бирюк Лёша"),
    ("biryukova", "Бирюкова Полина"),
    ("bogdanchik", "Богданчик Никита"),
    ("bukatin", "Букатин Максимилиан"),
    ("gabro", "Габро Богдан"),
    ("gaponenko", "Гапоненко Юля"),
    ("grinyuk", "Гринюк Настя"),
    ("evstigneev", "Евстигнеев Матвей"),
    ("zankevich", "Занкевич Аня"),
    ("zyk", "Зык Диана"),
    ("kib", "Киб Яна"),
    ("kovaleva", "Ковалева Надя"),
    ("kutsaev", "Куцаев Матвей"),
    ("lisok", "Лисок Андрей"),
    ("lupekin", "Лупекин Артем"),
    ("matskevich", "Мацкевич Лера"),
    ("mogilevets", "Могилевец Илья"),
    ("muradyan", "Мурадян Лиана"),
    ("nilov", "Нилов Матвей"),
    ("perepechko", "Перепечко Даник"),
    ("popova", "Попова Калина"),
    ("rudenya", "Руденя Милана"),
    ("semenchkenko", "Семенчкенко Костя"),
    ("sluka", "Слука Мария"),
    ("stasilovich", "Стасилович Катя"),
    ("khromova", "Хромова Настя"),
    ("yaronsky", "Яронский Тимофей"),
];

/// Last and first name as written in columns A and B of a grades row.
/// Rows with fewer than two cells or no last name carry no identity.
fn row_name(row: &[String]) -> Option<(&str, &str)> {
    if row.len() < 2 {
        return None;
    }
    let last = row[0].trim();
    if last.is_empty() {
        return None;
    }
    Some((last, row[1].trim()))
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// The fixed set of portal accounts and the rules tying students to
/// spreadsheet rows.
#[derive(Debug, Clone)]
pub struct Roster {
    users: Vec<User>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Roster {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    pub fn builtin() -> Self {
        let mut users = vec![
            User::new("admin1", "admin", "admin", "Администратор", Role::Admin, ""),
            User::new("admin2", "director", "director", "Директор школы", Role::Admin, ""),
        ];
        users.extend(STUDENTS.iter().enumerate().map(|(i, (username, name))| {
            User::new(
                &format!("student{}", i + 1),
                username,
                STUDENT_PASSWORD,
                name,
                Role::Student,
                DEFAULT_CLASS,
            )
        }));
        Self { users }
    }

    pub fn find_user(&self, username: &str, password: &str) -> Option<&User> {
        let user = self.users.iter().find(|u| u.username == username)?;
        let matches: bool = user.password.as_bytes().ct_eq(password.as_bytes()).into();
        matches.then_some(user)
    }

    pub fn user_by_id(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn student_by_id(&self, id: &str) -> Option<&User> {
        self.user_by_id(id).filter(|u| u.role == Role::Student)
    }

    pub fn all_students(&self) -> Vec<&User> {
        self.users.iter().filter(|u| u.role == Role::Student).collect()
    }

    pub fn students_by_class(&self, class: &str) -> Vec<&User> {
        self.users
            .iter()
            .filter(|u| u.role == Role::Student && u.class == class)
            .collect()
    }

    pub fn all_classes(&self) -> Vec<String> {
        let mut classes: Vec<String> = self
            .users
            .iter()
            .filter(|u| u.role == Role::Student && !u.class.is_empty())
            .map(|u| u.class.clone())
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }

    fn students_with_last_name(&self, last: &str) -> impl Iterator<Item = &User> + '_ {
        let last = last.to_lowercase();
        self.users
            .iter()
            .filter(move |u| u.role == Role::Student && u.name_parts().0.to_lowercase() == last)
    }

    /// A row with an empty first-name cell belongs to a student only when no
    /// other student shares the last name.
    fn owns_wildcard_row(&self, student: &User) -> bool {
        self.students_with_last_name(student.name_parts().0).count() == 1
    }

    /// Index of the student's row. An exact last+first match anywhere in the
    /// sheet beats an earlier row with an empty first name.
    pub fn find_row(&self, student: &User, rows: &[Vec<String>]) -> Option<usize> {
        let (last, first) = student.name_parts();
        let mut wildcard = None;
        for (index, row) in rows.iter().enumerate() {
            let Some((row_last, row_first)) = row_name(row) else {
                continue;
            };
            if !same_name(row_last, last) {
                continue;
            }
            if same_name(row_first, first) {
                return Some(index);
            }
            if row_first.is_empty() && wildcard.is_none() {
                wildcard = Some(index);
            }
        }
        wildcard.filter(|_| self.owns_wildcard_row(student))
    }

    /// Student a grades row belongs to, if any.
    pub fn owner_of_row(&self, row: &[String]) -> Option<&User> {
        let (row_last, row_first) = row_name(row)?;
        let mut same_last = self.students_with_last_name(row_last);
        if let Some(exact) = self
            .students_with_last_name(row_last)
            .find(|u| same_name(u.name_parts().1, row_first))
        {
            return Some(exact);
        }
        if !row_first.is_empty() {
            return None;
        }
        match (same_last.next(), same_last.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}
