use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Lesson numbers are unique within a course but need not be contiguous or
/// start at zero.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// The title is the primary key across the corpus; re-ingesting a document
/// with the same title replaces the stored course wholesale.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn lesson_link(&self, number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|lesson| lesson.number == number)
            .and_then(|lesson| lesson.link.as_deref())
    }
}

/// An embeddable span of course text. `content` already carries the
/// course/lesson prefix added at chunking time; `lesson_number` is `None`
/// for unlabeled preamble text.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Storage identifier inside the content collection.
    pub fn storage_id(&self) -> String {
        format!("{}_{}", self.course_title, self.chunk_index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseStats {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// One ranked hit from the content collection; lower `distance` is more
/// relevant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub label: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcedChunk {
    pub content: String,
    pub source: SourceRef,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_id_combines_title_and_index() {
        let chunk = CourseChunk {
            content: "Lesson 0 content: Welcome.".to_string(),
            course_title: "Intro to X".to_string(),
            lesson_number: Some(0),
            chunk_index: 3,
        };
        assert_eq!(chunk.storage_id(), "Intro to X_3");
    }

    #[test]
    fn lesson_link_lookup_is_by_number_not_position() {
        let course = Course {
            title: "Intro to X".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![
                Lesson {
                    number: 4,
                    title: "Advanced".to_string(),
                    link: Some("https://example.com/4".to_string()),
                },
                Lesson {
                    number: 1,
                    title: "Basics".to_string(),
                    link: None,
                },
            ],
        };

        assert_eq!(course.lesson_link(4), Some("https://example.com/4"));
        assert_eq!(course.lesson_link(1), None);
        assert_eq!(course.lesson_link(9), None);
    }
}
