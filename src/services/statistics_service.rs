use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::grade::{Grade, GradeBook, Quarter, StudentGrades};
use crate::models::subject::SUBJECTS;

const RANKED_SUBJECTS: usize = 3;
const CLASS_COMPARISONS: usize = 5;

/// Mean grade value, 0 for an empty list. Rounded halves go up when
/// `round_to_integer` is set, otherwise the result keeps two decimals.
pub fn calculate_average(grades: &[Grade], round_to_integer: bool) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    let sum: u32 = grades.iter().map(|g| u32::from(g.value)).sum();
    let average = f64::from(sum) / grades.len() as f64;
    if round_to_integer {
        (average + 0.5).floor()
    } else {
        (average * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: String,
    pub subject_name: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassComparison {
    pub subject_id: String,
    pub subject_name: String,
    pub average: f64,
    pub class_average: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub overall_average: f64,
    pub subjects: Vec<SubjectAverage>,
    pub best_subjects: Vec<SubjectAverage>,
    pub worst_subjects: Vec<SubjectAverage>,
    pub quarter_averages: BTreeMap<Quarter, f64>,
    pub class_comparison: Vec<ClassComparison>,
}

/// Average of the live grades per subject across every student in the book.
/// Subjects nobody has grades in are absent.
pub fn class_averages(book: &GradeBook) -> HashMap<String, f64> {
    let mut pooled: HashMap<&str, Vec<Grade>> = HashMap::new();
    for student in book.students.values() {
        for (subject_id, grades) in &student.subjects {
            pooled
                .entry(subject_id.as_str())
                .or_default()
                .extend(grades.current.iter().cloned());
        }
    }
    pooled
        .into_iter()
        .filter(|(_, grades)| !grades.is_empty())
        .map(|(id, grades)| (id.to_string(), calculate_average(&grades, false)))
        .collect()
}

pub fn summarize(student: &StudentGrades, class: &HashMap<String, f64>) -> StudentSummary {
    let subjects: Vec<SubjectAverage> = SUBJECTS
        .iter()
        .filter_map(|subject| {
            let grades = student.subjects.get(subject.id)?;
            let average = calculate_average(&grades.current, false);
            (average > 0.0).then(|| SubjectAverage {
                subject_id: subject.id.to_string(),
                subject_name: subject.name.to_string(),
                average,
            })
        })
        .collect();

    let mut ranked = subjects.clone();
    ranked.sort_by(|a, b| b.average.total_cmp(&a.average));
    let best_subjects: Vec<SubjectAverage> = ranked.iter().take(RANKED_SUBJECTS).cloned().collect();
    ranked.sort_by(|a, b| a.average.total_cmp(&b.average));
    let worst_subjects: Vec<SubjectAverage> = ranked.iter().take(RANKED_SUBJECTS).cloned().collect();

    let all_current: Vec<Grade> = student
        .subjects
        .values()
        .flat_map(|s| s.current.iter().cloned())
        .collect();

    let quarter_averages: BTreeMap<Quarter, f64> = Quarter::ARCHIVED
        .into_iter()
        .map(|quarter| {
            let grades: Vec<Grade> = student
                .subjects
                .values()
                .filter_map(|s| s.quarters.get(&quarter))
                .flat_map(|g| g.iter().cloned())
                .collect();
            (quarter, calculate_average(&grades, false))
        })
        .collect();

    let mut class_comparison: Vec<ClassComparison> = subjects
        .iter()
        .filter_map(|s| {
            let class_average = *class.get(&s.subject_id)?;
            (class_average > 0.0).then(|| ClassComparison {
                subject_id: s.subject_id.clone(),
                subject_name: s.subject_name.clone(),
                average: s.average,
                class_average,
                difference: ((s.average - class_average) * 100.0).round() / 100.0,
            })
        })
        .collect();
    class_comparison.sort_by(|a, b| b.difference.abs().total_cmp(&a.difference.abs()));
    class_comparison.truncate(CLASS_COMPARISONS);

    StudentSummary {
        student_id: student.student_id.clone(),
        overall_average: calculate_average(&all_current, false),
        subjects,
        best_subjects,
        worst_subjects,
        quarter_averages,
        class_comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::now;

    fn grades(values: &[u8]) -> Vec<Grade> {
        values.iter().map(|v| Grade::new(*v, now())).collect()
    }

    #[test]
    fn averages_round_halves_up() {
        assert_eq!(calculate_average(&[], false), 0.0);
        assert_eq!(calculate_average(&grades(&[8, 9]), true), 9.0);
        assert_eq!(calculate_average(&grades(&[8, 8, 9]), true), 8.0);
        assert_eq!(calculate_average(&grades(&[8, 8, 9]), false), 8.33);
        assert_eq!(calculate_average(&grades(&[7, 8]), false), 7.5);
    }

    #[test]
    fn summary_ranks_subjects_and_compares_with_class() {
        let mut student = StudentGrades::empty("student1");
        student.subject_mut("math").current = grades(&[10, 9]);
        student.subject_mut("physics").current = grades(&[4]);
        student.subject_mut("chemistry").current = grades(&[7]);
        student.subject_mut("biology").current = grades(&[6, 6]);
        student.subject_mut("math").quarters.insert(Quarter::Q1, grades(&[8]));
        student.subject_mut("physics").quarters.insert(Quarter::Q1, grades(&[5]));

        let mut other = StudentGrades::empty("student2");
        other.subject_mut("math").current = grades(&[5]);

        let mut book = GradeBook::default();
        book.students.insert("student1".into(), student.clone());
        book.students.insert("student2".into(), other);
        let class = class_averages(&book);
        assert_eq!(class.get("math"), Some(&8.0));
        assert!(class.get("geography").is_none());

        let summary = summarize(&student, &class);
        assert_eq!(summary.subjects.len(), 4);
        assert_eq!(summary.best_subjects[0].subject_id, "math");
        assert_eq!(summary.worst_subjects[0].subject_id, "physics");
        assert_eq!(summary.best_subjects.len(), 3);
        assert_eq!(summary.quarter_averages[&Quarter::Q1], 6.5);
        assert_eq!(summary.quarter_averages[&Quarter::Q2], 0.0);
        assert_eq!(summary.overall_average, 7.0);

        let math = summary
            .class_comparison
            .iter()
            .find(|c| c.subject_id == "math")
            .unwrap();
        assert_eq!(math.difference, 1.5);
    }
}
