//! Applies planned edits to the source text.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{ManifestError, PatchConflict};
use crate::manifest::Position;
use crate::planner::{Edit, EditKind};

/// One applied edit, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: EditKind,
    pub line: usize,
    pub column: usize,
    pub old: Option<String>,
    pub new: String,
}

impl Change {
    fn from_edit(edit: &Edit) -> Self {
        let Position { line, column } = edit.position;
        Self {
            kind: edit.kind,
            line,
            column,
            old: edit.old.clone(),
            new: edit.new.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub source: String,
    /// In document order.
    pub changes: Vec<Change>,
}

impl Patched {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Applies every edit in one pass, last offset first. Overlapping edits are
/// rejected before anything is touched.
pub fn apply(source: &str, edits: &[Edit]) -> Result<Patched, PatchConflict> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by_key(|edit| (edit.span.start, edit.span.end));

    for pair in ordered.windows(2) {
        let (first, second) = (pair[0].span, pair[1].span);
        if first.overlaps(&second) {
            return Err(PatchConflict {
                first: first.range(),
                second: second.range(),
            });
        }
    }
    if let Some(edit) = ordered.iter().find(|e| e.span.end > source.len()) {
        return Err(PatchConflict {
            first: edit.span.range(),
            second: source.len()..source.len(),
        });
    }

    let mut patched = source.to_string();
    for edit in ordered.iter().rev() {
        patched.replace_range(edit.span.range(), &edit.replacement);
    }

    Ok(Patched {
        source: patched,
        changes: ordered.iter().map(|edit| Change::from_edit(edit)).collect(),
    })
}

/// Replaces `path` with `contents` through a sibling temporary file, keeping
/// the original permissions. Readers see either the old or the new file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ManifestError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io = |err| ManifestError::io(path, err);

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io)?;
    tmp.write_all(contents.as_bytes()).map_err(io)?;
    tmp.as_file().sync_all().map_err(io)?;
    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(io)?;
    }
    tmp.persist(path).map_err(|err| io(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Span, StatementId};

    fn edit(kind: EditKind, span: Span, replacement: &str) -> Edit {
        Edit {
            kind,
            span,
            replacement: replacement.to_string(),
            statement: StatementId(0),
            position: Position { line: 1, column: 1 },
            old: None,
            new: replacement.to_string(),
        }
    }

    #[test]
    fn applies_in_descending_order() {
        let source = "abc def ghi";
        let edits = vec![
            edit(EditKind::Update, Span::new(0, 3), "ABCD"),
            edit(EditKind::Update, Span::new(8, 11), "G"),
            edit(EditKind::Insert, Span::empty_at(7), "!"),
        ];
        let patched = apply(source, &edits).expect("apply");
        assert_eq!(patched.source, "ABCD def! G");
        assert_eq!(patched.changes.len(), 3);
        assert_eq!(patched.changes[0].new, "ABCD");
    }

    #[test]
    fn no_edits_is_identity() {
        let patched = apply("x = 1\n", &[]).expect("apply");
        assert_eq!(patched.source, "x = 1\n");
        assert!(patched.is_unchanged());
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![
            edit(EditKind::Update, Span::new(0, 4), "a"),
            edit(EditKind::Update, Span::new(2, 6), "b"),
        ];
        assert_eq!(
            apply("0123456789", &edits),
            Err(PatchConflict {
                first: 0..4,
                second: 2..6
            })
        );
    }

    #[test]
    fn duplicate_insertions_are_rejected() {
        let edits = vec![
            edit(EditKind::Insert, Span::empty_at(3), "a"),
            edit(EditKind::Insert, Span::empty_at(3), "b"),
        ];
        assert!(apply("0123", &edits).is_err());
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("example.rb");
        std::fs::write(&path, "old").expect("seed");
        write_atomic(&path, "new").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "new");
        let leftovers = std::fs::read_dir(dir.path()).expect("dir").count();
        assert_eq!(leftovers, 1);
    }
}
