use crate::chunking::{chunk_sentences, ChunkingConfig};
use crate::error::IngestError;
use crate::models::{Course, CourseChunk, Lesson};
use crate::segmenter::SentenceSegmenter;
use regex::Regex;

const TITLE_PREFIX: &str = "Course Title:";
const LINK_PREFIX: &str = "Course Link:";
const INSTRUCTOR_PREFIX: &str = "Course Instructor:";
const LESSON_LINK_PREFIX: &str = "Lesson Link:";

/// A parsed source document: the course metadata plus its complete ordered
/// chunk sequence.
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

/// Parses the structured course file format:
///
/// ```text
/// Course Title: <string>
/// Course Link: <url, optional>
/// Course Instructor: <string, optional>
///
/// Lesson 0: <title>
/// Lesson Link: <url, optional>
/// <body text...>
/// ```
///
/// Text before the first lesson marker is chunked without a lesson number.
pub struct DocumentParser {
    segmenter: SentenceSegmenter,
    lesson_marker: Regex,
    config: ChunkingConfig,
}

impl DocumentParser {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            segmenter: SentenceSegmenter::new()?,
            lesson_marker: Regex::new(r"^Lesson\s+(\d+):\s*(.*)$")?,
            config,
        })
    }

    pub fn parse(&self, raw_text: &str, source_path: &str) -> Result<ParsedCourse, IngestError> {
        let lines: Vec<&str> = raw_text.lines().collect();
        let (mut course, body_start) = self.parse_header(&lines, source_path)?;
        let segments = self.split_segments(&lines[body_start..]);

        let mut chunks = Vec::new();
        let mut chunk_index = 0usize;
        let mut first_document_chunk = true;

        for segment in segments {
            if let Some(lesson) = &segment.lesson {
                course.lessons.push(lesson.clone());
            }

            let body = segment.lines.join("\n");
            let body = body.trim();
            if body.is_empty() {
                continue;
            }

            let sentences: Vec<&str> = self.segmenter.segment(body).collect();
            let lesson_number = segment.lesson.as_ref().map(|lesson| lesson.number);

            for (position, text) in chunk_sentences(&sentences, &self.config)
                .into_iter()
                .enumerate()
            {
                let content = if position == 0 {
                    prefixed(&course.title, lesson_number, first_document_chunk, &text)
                } else {
                    text
                };
                first_document_chunk = false;

                chunks.push(CourseChunk {
                    content,
                    course_title: course.title.clone(),
                    lesson_number,
                    chunk_index,
                });
                chunk_index += 1;
            }
        }

        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument(source_path.to_string()));
        }

        Ok(ParsedCourse { course, chunks })
    }

    /// Header lines are the first non-empty lines of the file: the title is
    /// mandatory, the link and instructor lines are consumed when present.
    fn parse_header(
        &self,
        lines: &[&str],
        source_path: &str,
    ) -> Result<(Course, usize), IngestError> {
        let mut cursor = 0usize;

        let title = next_header_value(lines, &mut cursor, TITLE_PREFIX).ok_or_else(|| {
            IngestError::MalformedHeader {
                path: source_path.to_string(),
                details: format!("first non-empty line must start with '{TITLE_PREFIX}'"),
            }
        })?;
        if title.is_empty() {
            return Err(IngestError::MalformedHeader {
                path: source_path.to_string(),
                details: "course title is empty".to_string(),
            });
        }

        let course_link = next_header_value(lines, &mut cursor, LINK_PREFIX);
        let instructor = next_header_value(lines, &mut cursor, INSTRUCTOR_PREFIX);

        let course = Course {
            title,
            course_link: course_link.filter(|value| !value.is_empty()),
            instructor: instructor.filter(|value| !value.is_empty()),
            lessons: Vec::new(),
        };
        Ok((course, cursor))
    }

    /// Splits body lines into one preamble segment (possibly empty) followed
    /// by one segment per lesson marker. A `Lesson Link:` line directly
    /// under a marker belongs to that lesson, not its body.
    fn split_segments<'a>(&self, lines: &[&'a str]) -> Vec<Segment<'a>> {
        let mut segments = vec![Segment::preamble()];

        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            if let Some(caps) = self.lesson_marker.captures(line.trim_end()) {
                let number = caps
                    .get(1)
                    .and_then(|m| m.as_str().parse::<u32>().ok());
                let title = caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();

                if let Some(number) = number {
                    let mut link = None;
                    if let Some(next) = lines.get(index + 1) {
                        if let Some(value) = next.trim().strip_prefix(LESSON_LINK_PREFIX) {
                            link = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                            index += 1;
                        }
                    }
                    segments.push(Segment::lesson(Lesson {
                        number,
                        title,
                        link,
                    }));
                    index += 1;
                    continue;
                }
            }

            if let Some(current) = segments.last_mut() {
                current.lines.push(line);
            }
            index += 1;
        }

        segments
    }
}

fn prefixed(
    course_title: &str,
    lesson_number: Option<u32>,
    first_document_chunk: bool,
    text: &str,
) -> String {
    match (first_document_chunk, lesson_number) {
        (true, Some(number)) => {
            format!("Course {course_title} Lesson {number} content: {text}")
        }
        (true, None) => format!("Course {course_title} content: {text}"),
        (false, Some(number)) => format!("Lesson {number} content: {text}"),
        (false, None) => text.to_string(),
    }
}

fn next_header_value(lines: &[&str], cursor: &mut usize, prefix: &str) -> Option<String> {
    while *cursor < lines.len() && lines[*cursor].trim().is_empty() {
        *cursor += 1;
    }
    let value = lines
        .get(*cursor)?
        .trim()
        .strip_prefix(prefix)?
        .trim()
        .to_string();
    *cursor += 1;
    Some(value)
}

struct Segment<'a> {
    lesson: Option<Lesson>,
    lines: Vec<&'a str>,
}

impl<'a> Segment<'a> {
    fn preamble() -> Self {
        Self {
            lesson: None,
            lines: Vec::new(),
        }
    }

    fn lesson(lesson: Lesson) -> Self {
        Self {
            lesson: Some(lesson),
            lines: Vec::new(),
        }
    }
}
