//! Org text codec.
//!
//! Parses the line-oriented org markup into a [`TaskTree`] and
//! serializes a tree back, losslessly at the tree level: any tree read
//! from valid markup serializes to markup that parses to the same tree.
//!
//! A headline is a run of `*` markers (the count is the nesting depth),
//! an optional `TODO`/`DONE` keyword, and the title. Every other line is
//! a note of the nearest preceding headline. `SCHEDULED:`/`CLOSED:`
//! markers inside note lines are lifted into the node's stamp fields at
//! parse time and re-emitted on a planning line.

use crate::error::{Error, Result};
use crate::timestamp::{
    format_closed, format_scheduled, parse_stamp_body, EnglishWeekdays, WeekdayNames,
    CLOSED_PREFIX, SCHEDULED_PREFIX,
};
use crate::tree::{NodeId, TaskNode, TaskTree};

/// Parse org markup. Empty input is the empty tree; non-empty input
/// without a single headline is rejected.
pub fn parse(text: &str) -> Result<TaskTree> {
    let mut tree = TaskTree::new();
    // Rightmost spine of the tree: spine[d - 1] is the open headline at
    // depth d. Notes attach to the most recently parsed headline, which
    // is always the spine's last element.
    let mut spine: Vec<NodeId> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        match parse_headline(raw) {
            Some(headline) => {
                if headline.depth > spine.len() + 1 {
                    return Err(Error::Parse {
                        line,
                        message: format!(
                            "headline depth {} skips levels (deepest open headline is {})",
                            headline.depth,
                            spine.len()
                        ),
                    });
                }
                let parent = match headline.depth {
                    1 => tree.root(),
                    depth => spine[depth - 2],
                };
                let mut node = TaskNode::titled(headline.title);
                node.todo = headline.todo;
                node.completed = headline.completed;
                let id = tree.add_child(parent, node);
                spine.truncate(headline.depth - 1);
                spine.push(id);
            }
            None => {
                let current = *spine.last().ok_or_else(|| Error::Parse {
                    line,
                    message: "note line before any headline".to_string(),
                })?;
                attach_note(&mut tree, current, raw, line)?;
            }
        }
    }

    Ok(tree)
}

/// Serialize with English weekday display names.
pub fn serialize(tree: &TaskTree) -> String {
    serialize_with(tree, &EnglishWeekdays)
}

/// Serialize, rendering weekday abbreviations through `names`.
///
/// Children print depth-first. Note lines are indented two spaces past
/// the marker run, with a space escape before a leading `*` so they
/// survive re-parsing. Every line ends with a newline; the empty tree
/// serializes to the empty string.
pub fn serialize_with(tree: &TaskTree, names: &dyn WeekdayNames) -> String {
    let mut out = String::new();
    write_subtree(tree, tree.root(), 0, names, &mut out);
    out
}

struct Headline {
    depth: usize,
    todo: bool,
    completed: bool,
    title: String,
}

fn parse_headline(line: &str) -> Option<Headline> {
    let depth = line.chars().take_while(|&c| c == '*').count();
    if depth == 0 {
        return None;
    }
    let rest = line[depth..].trim_start_matches(' ');
    let (todo, completed, title) = if let Some(after) = rest.strip_prefix("DONE") {
        (true, true, after.trim_start_matches(' '))
    } else if let Some(after) = rest.strip_prefix("TODO") {
        (true, false, after.trim_start_matches(' '))
    } else {
        (false, false, rest)
    };
    Some(Headline {
        depth,
        todo,
        completed,
        title: title.to_string(),
    })
}

fn attach_note(tree: &mut TaskTree, id: NodeId, raw: &str, line: usize) -> Result<()> {
    let trimmed = raw.trim();
    let mut text = trimmed.to_string();
    let node = tree.get_mut(id);

    if let Some(body) = take_marker(&mut text, SCHEDULED_PREFIX, '<', '>') {
        let (start, end) = parse_stamp_body(&body).map_err(|err| Error::Parse {
            line,
            message: err.to_string(),
        })?;
        node.scheduled_start = Some(start);
        node.scheduled_end = end;
    }
    if let Some(body) = take_marker(&mut text, CLOSED_PREFIX, '[', ']') {
        let (stamp, _) = parse_stamp_body(&body).map_err(|err| Error::Parse {
            line,
            message: err.to_string(),
        })?;
        node.closed = Some(stamp);
    }

    if text.len() == trimmed.len() {
        // No markers: the whole (trimmed) line is a note, blank lines
        // included.
        node.notes.push(text);
    } else {
        // Markers were lifted out; only surviving text stays a note.
        let rest = text.trim();
        if !rest.is_empty() {
            node.notes.push(rest.to_string());
        }
    }
    Ok(())
}

/// Cut `PREFIX<body>` (or `PREFIX[body]`) out of `text`, returning the
/// body. Leaves `text` untouched when the marker is absent or unclosed.
fn take_marker(text: &mut String, prefix: &str, open: char, close: char) -> Option<String> {
    let start = text.find(prefix)?;
    let body_start = start + prefix.len() + open.len_utf8();
    if text[start + prefix.len()..].chars().next() != Some(open) {
        return None;
    }
    let body_len = text[body_start..].find(close)?;
    let body = text[body_start..body_start + body_len].to_string();
    text.replace_range(start..body_start + body_len + close.len_utf8(), "");
    Some(body)
}

fn write_subtree(
    tree: &TaskTree,
    id: NodeId,
    depth: usize,
    names: &dyn WeekdayNames,
    out: &mut String,
) {
    for &child in tree.children(id) {
        let node = tree.get(child);
        let child_depth = depth + 1;

        out.push_str(&"*".repeat(child_depth));
        out.push(' ');
        if node.completed {
            out.push_str("DONE ");
        } else if node.todo {
            out.push_str("TODO ");
        }
        out.push_str(&node.title);
        out.push('\n');

        let indent = " ".repeat(child_depth + 2);
        if let Some(planning) = planning_line(node, names) {
            out.push_str(&indent);
            out.push_str(&planning);
            out.push('\n');
        }
        for note in &node.notes {
            out.push_str(&indent);
            if note.starts_with('*') {
                out.push(' ');
            }
            out.push_str(note);
            out.push('\n');
        }

        write_subtree(tree, child, child_depth, names, out);
    }
}

fn planning_line(node: &TaskNode, names: &dyn WeekdayNames) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(closed) = &node.closed {
        parts.push(format_closed(closed, names));
    }
    if let Some(start) = &node.scheduled_start {
        parts.push(format_scheduled(start, node.scheduled_end.as_ref(), names));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::OrgStamp;
    use chrono::NaiveDate;

    fn stamp(y: i32, m: u32, d: u32) -> OrgStamp {
        OrgStamp::date(NaiveDate::from_ymd_opt(y, m, d).expect("valid date"))
    }

    #[test]
    fn empty_input_is_empty_tree() {
        let tree = parse("").expect("parse");
        assert!(tree.is_empty());
        assert_eq!(serialize(&tree), "");
    }

    #[test]
    fn notes_without_headline_are_rejected() {
        let err = parse("just some text\n").expect_err("no headline");
        assert!(matches!(err, Error::Parse { line: 1, .. }));

        // A lone blank line is still content with zero headlines.
        assert!(parse("\n").is_err());
    }

    #[test]
    fn parses_statuses_and_depth() {
        let text = "* TODO Buy milk\n** DONE Pick store\n* Plain headline\n";
        let tree = parse(text).expect("parse");

        let top: Vec<_> = tree.children(tree.root()).to_vec();
        assert_eq!(top.len(), 2);

        let milk = tree.get(top[0]);
        assert!(milk.todo && !milk.completed);
        assert_eq!(milk.title, "Buy milk");

        let store = tree.get(tree.children(top[0])[0]);
        assert!(store.todo && store.completed);

        let plain = tree.get(top[1]);
        assert!(!plain.todo && !plain.completed);
    }

    #[test]
    fn headline_without_space_is_still_a_headline() {
        let tree = parse("*Tight title\n").expect("parse");
        assert_eq!(tree.get(tree.children(tree.root())[0]).title, "Tight title");
    }

    #[test]
    fn notes_attach_to_nearest_headline() {
        let text = "* A\n** A.1\n  deep note\n* B\n  top note\n";
        let tree = parse(text).expect("parse");

        let top = tree.children(tree.root());
        let a1 = tree.children(top[0])[0];
        assert_eq!(tree.get(a1).notes, vec!["deep note"]);
        assert_eq!(tree.get(top[1]).notes, vec!["top note"]);
    }

    #[test]
    fn depth_jump_is_rejected() {
        let err = parse("* A\n*** too deep\n").expect_err("depth jump");
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn scheduled_and_closed_are_lifted_from_notes() {
        let text = "* DONE Ship it\n  CLOSED: [2015-12-10 Thu 09:15] SCHEDULED: <2015-12-09 Wed 20:40-21:30>\n  remaining note\n";
        let tree = parse(text).expect("parse");
        let node = tree.get(tree.children(tree.root())[0]);

        let start = node.scheduled_start.expect("start");
        assert!(start.has_time);
        assert!(node.scheduled_end.expect("end").has_time);
        assert!(node.closed.expect("closed").has_time);
        assert_eq!(node.notes, vec!["remaining note"]);
    }

    #[test]
    fn marker_line_with_text_keeps_the_text() {
        let text = "* Task\n  call Bob SCHEDULED: <2015-12-09>\n";
        let tree = parse(text).expect("parse");
        let node = tree.get(tree.children(tree.root())[0]);
        assert_eq!(node.scheduled_start, Some(stamp(2015, 12, 9)));
        assert_eq!(node.notes, vec!["call Bob"]);
    }

    #[test]
    fn bad_stamp_body_is_a_parse_error() {
        let err = parse("* Task\n  SCHEDULED: <someday>\n").expect_err("bad stamp");
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn serializes_expected_shape() {
        let mut tree = TaskTree::new();
        let mut done = TaskNode::titled("Ship it");
        done.todo = true;
        done.completed = true;
        done.closed = Some(stamp(2015, 12, 10));
        done.notes.push("remaining note".to_string());
        let top = tree.add_child(tree.root(), done);

        let mut sub = TaskNode::titled("Subtask");
        sub.todo = true;
        sub.notes.push("* leading star".to_string());
        tree.add_child(top, sub);

        assert_eq!(
            serialize(&tree),
            "* DONE Ship it\n   CLOSED: [2015-12-10 Thu]\n   remaining note\n** TODO Subtask\n     * leading star\n"
        );
    }

    #[test]
    fn round_trips_trees() {
        let text = "* TODO A\n  SCHEDULED: <2015-12-09 Wed 20:40-21:30>\n  alpha note\n** A.1\n   * escaped star note\n   PREV_ORG_TITLE: Old A.1\n* DONE B\n  CLOSED: [2015-12-10 Thu 09:15]\n";
        let once = parse(text).expect("first parse");
        let rendered = serialize(&once);
        let twice = parse(&rendered).expect("second parse");

        assert!(once.same_as(&twice));
        // A canonically rendered tree is byte-stable.
        assert_eq!(serialize(&twice), rendered);
    }
}
