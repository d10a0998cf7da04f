/// Collapse adjacent occurrences into line groups.
///
/// Occurrences are sorted by `(file_path, line_number)`; a sweep then
/// merges each one into the current group when it overlaps or directly
/// follows it in the same file, regardless of fingerprint.
use super::{LineGroup, LineSource};

pub fn find_line_groups(sources: &mut [LineSource]) -> Vec<LineGroup> {
    sources.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line_number.cmp(&b.line_number))
            .then(a.line_hash.cmp(&b.line_hash))
    });

    let mut groups = Vec::new();
    let mut current: Option<LineGroup> = None;

    for source in sources.iter() {
        if let Some(group) = current.as_mut()
            && merge(group, source)
        {
            continue;
        }
        if let Some(done) = current.replace(LineGroup::starting_at(source)) {
            groups.push(done);
        }
    }
    groups.extend(current);
    groups
}

/// Extend `group` with `source` when they touch; returns whether they did.
fn merge(group: &mut LineGroup, source: &LineSource) -> bool {
    if group.file_path != source.file_path || source.line_number > group.end() + 1 {
        return false;
    }
    let start = group.line_number.min(source.line_number);
    let end = group.end().max(source.line_number + source.line_count - 1);
    group.line_number = start;
    group.line_count = end - start + 1;
    if !group.line_hashes.contains(&source.line_hash) {
        group.line_hashes.push(source.line_hash);
    }
    true
}
