//! Inclusion transformation of concurrent operations
//!
//! `transform(op, against)` rewrites `op`, issued without knowledge of
//! `against`, so that applying it after `against` has the effect its author
//! intended. Inserts are never discarded; a delete disappears only when a
//! concurrent delete already removed everything it covered.

use super::operation::{Edit, Operation};

/// Result of transforming one operation against another
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transformed {
    /// The operation has nothing left to do
    Noop,
    One(Operation),
    /// A delete cut in two by a concurrent insert. The second half is
    /// expressed in coordinates after the first half has been applied.
    Split(Operation, Operation),
}

impl Transformed {
    pub fn is_noop(&self) -> bool {
        matches!(self, Transformed::Noop)
    }

    pub fn into_vec(self) -> Vec<Operation> {
        match self {
            Transformed::Noop => Vec::new(),
            Transformed::One(op) => vec![op],
            Transformed::Split(left, right) => vec![left, right],
        }
    }
}

/// Transform `op` so it applies after `against`. Both operations must be
/// expressed against the same document state.
pub fn transform(op: &Operation, against: &Operation) -> Transformed {
    match (&op.edit, &against.edit) {
        (Edit::Insert { .. }, Edit::Insert { .. }) => {
            let stays = op.index < against.index
                || (op.index == against.index && op.tie_key() < against.tie_key());
            if stays {
                Transformed::One(op.clone())
            } else {
                Transformed::One(op.at(op.index + against.len()))
            }
        }
        (Edit::Insert { .. }, Edit::Delete { length }) => {
            if op.index <= against.index {
                Transformed::One(op.clone())
            } else if op.index >= against.end() {
                Transformed::One(op.at(op.index - length))
            } else {
                // insertion point was deleted; keep the text at the cut
                Transformed::One(op.at(against.index))
            }
        }
        (Edit::Delete { length }, Edit::Insert { .. }) => {
            let inserted = against.len();
            if op.end() <= against.index {
                Transformed::One(op.clone())
            } else if op.index >= against.index {
                Transformed::One(op.at(op.index + inserted))
            } else {
                let left_len = against.index - op.index;
                let left = Operation {
                    edit: Edit::Delete { length: left_len },
                    ..op.clone()
                };
                let right = Operation {
                    index: op.index + inserted,
                    edit: Edit::Delete {
                        length: length - left_len,
                    },
                    ..op.clone()
                };
                Transformed::Split(left, right)
            }
        }
        (Edit::Delete { length }, Edit::Delete { length: removed }) => {
            if op.end() <= against.index {
                Transformed::One(op.clone())
            } else if op.index >= against.end() {
                Transformed::One(op.at(op.index - removed))
            } else {
                let overlap = op.end().min(against.end()) - op.index.max(against.index);
                let remaining = length - overlap;
                if remaining == 0 {
                    return Transformed::Noop;
                }
                Transformed::One(Operation {
                    index: op.index.min(against.index),
                    edit: Edit::Delete { length: remaining },
                    ..op.clone()
                })
            }
        }
    }
}

/// Transform the sequence `ops` against the sequence `against`, both issued
/// from the same document state.
///
/// Returns `(ops', against')`: `ops'` applies after `against`, and
/// `against'` applies after `ops`. Each sequence is applied left to right.
pub fn transform_seq(ops: &[Operation], against: &[Operation]) -> (Vec<Operation>, Vec<Operation>) {
    let mut ops = ops.to_vec();
    let mut against_out = Vec::with_capacity(against.len());

    for other in against {
        let (next, other_out) = transform_many(&ops, std::slice::from_ref(other));
        ops = next;
        against_out.extend(other_out);
    }

    (ops, against_out)
}

/// Inclusion recursion over two short sequences
fn transform_many(a: &[Operation], b: &[Operation]) -> (Vec<Operation>, Vec<Operation>) {
    match (a, b) {
        ([], _) | (_, []) => (a.to_vec(), b.to_vec()),
        ([x], [y]) => (transform(x, y).into_vec(), transform(y, x).into_vec()),
        ([_], [_, ..]) => {
            let (a1, b_head) = transform_many(a, &b[..1]);
            let (a2, b_tail) = transform_many(&a1, &b[1..]);
            (a2, [b_head, b_tail].concat())
        }
        _ => {
            let (a_head, b1) = transform_many(&a[..1], b);
            let (a_tail, b2) = transform_many(&a[1..], &b1);
            ([a_head, a_tail].concat(), b2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::apply::apply_to_text;

    fn ins(author: &str, index: usize, text: &str) -> Operation {
        Operation::insert(author, 1, index, text)
    }

    fn del(author: &str, index: usize, length: usize) -> Operation {
        Operation::delete(author, 1, index, length)
    }

    fn run(base: &str, ops: &[Operation]) -> String {
        let mut text = base.to_string();
        for op in ops {
            apply_to_text(&mut text, op).unwrap();
        }
        text
    }

    /// Both orders of applying `a` and `b` to `base` must produce one text
    fn assert_converges(base: &str, a: &Operation, b: &Operation) -> String {
        let (a_after_b, b_after_a) = transform_seq(&[a.clone()], &[b.clone()]);

        let mut left = vec![a.clone()];
        left.extend(b_after_a);
        let mut right = vec![b.clone()];
        right.extend(a_after_b);

        let via_a = run(base, &left);
        let via_b = run(base, &right);
        assert_eq!(via_a, via_b, "diverged for {:?} / {:?}", a, b);
        via_a
    }

    #[test]
    fn test_insert_insert_shifts_later_insert() {
        let op = ins("b", 3, "xy");
        assert_eq!(transform(&op, &ins("a", 1, "12")), Transformed::One(ins("b", 5, "xy")));
        assert_eq!(transform(&op, &ins("a", 4, "12")), Transformed::One(op.clone()));
    }

    #[test]
    fn test_insert_insert_tie_break() {
        let a1 = ins("a1", 0, "X");
        let a2 = ins("a2", 0, "Y");

        assert_eq!(transform(&a1, &a2), Transformed::One(a1.clone()));
        assert_eq!(transform(&a2, &a1), Transformed::One(ins("a2", 1, "Y")));
        assert_eq!(assert_converges("", &a1, &a2), "XY");

        // same author: the operation id decides
        let first = Operation::insert("a", 1, 0, "P");
        let second = Operation::insert("a", 2, 0, "Q");
        assert_eq!(assert_converges("", &second, &first), "PQ");
    }

    #[test]
    fn test_insert_against_delete() {
        let d = del("a", 2, 3);
        assert_eq!(transform(&ins("b", 2, "x"), &d), Transformed::One(ins("b", 2, "x")));
        assert_eq!(transform(&ins("b", 5, "x"), &d), Transformed::One(ins("b", 2, "x")));
        assert_eq!(transform(&ins("b", 7, "x"), &d), Transformed::One(ins("b", 4, "x")));
        // inside the deleted range: clamped, never dropped
        assert_eq!(transform(&ins("b", 3, "x"), &d), Transformed::One(ins("b", 2, "x")));
    }

    #[test]
    fn test_delete_against_insert() {
        let i = ins("a", 4, "xyz");
        assert_eq!(transform(&del("b", 1, 3), &i), Transformed::One(del("b", 1, 3)));
        assert_eq!(transform(&del("b", 4, 2), &i), Transformed::One(del("b", 7, 2)));
        assert_eq!(transform(&del("b", 6, 1), &i), Transformed::One(del("b", 9, 1)));
    }

    #[test]
    fn test_delete_split_by_insert() {
        let d = del("b", 1, 4);
        let i = ins("a", 3, "XY");
        assert_eq!(
            transform(&d, &i),
            Transformed::Split(del("b", 1, 2), del("b", 3, 2))
        );
        assert_eq!(assert_converges("abcdef", &d, &i), "aXYf");
    }

    #[test]
    fn test_delete_against_delete() {
        let against = del("a", 2, 3);
        assert_eq!(transform(&del("b", 0, 2), &against), Transformed::One(del("b", 0, 2)));
        assert_eq!(transform(&del("b", 6, 2), &against), Transformed::One(del("b", 3, 2)));
        // overlapping tail
        assert_eq!(transform(&del("b", 1, 3), &against), Transformed::One(del("b", 1, 1)));
        // overlapping head
        assert_eq!(transform(&del("b", 4, 3), &against), Transformed::One(del("b", 2, 2)));
        // covering
        assert_eq!(transform(&del("b", 1, 6), &against), Transformed::One(del("b", 1, 3)));
        // subsumed
        assert!(transform(&del("b", 2, 2), &against).is_noop());
        assert!(transform(&del("b", 2, 3), &against).is_noop());
    }

    #[test]
    fn test_example_insert_and_delete_converge() {
        let x = Operation::insert("X", 1, 1, "B");
        let y = Operation::delete("Y", 1, 0, 1);
        assert_eq!(transform(&x, &y), Transformed::One(Operation::insert("X", 1, 0, "B")));
        assert_eq!(transform(&y, &x), Transformed::One(y.clone()));
        assert_eq!(assert_converges("AC", &x, &y), "BC");
    }

    #[test]
    fn test_transform_seq_carries_split_through_history() {
        // "abcdef": delete "bcde" while someone inserted "XY" at 3, then
        // another editor appended "!" at the end
        let d = del("c", 1, 4);
        let history = vec![ins("a", 3, "XY"), ins("b", 8, "!")];

        let (ops, _) = transform_seq(&[d], &history);
        assert_eq!(ops.len(), 2);
        assert_eq!(run(&run("abcdef", &history), &ops), "aXYf!");
    }

    #[test]
    fn test_transform_seq_returns_both_sides() {
        let a = vec![del("a", 0, 2)];
        let b = vec![ins("b", 1, "Q"), ins("b", 3, "R")];
        let (a2, b2) = transform_seq(&a, &b);

        let left = run(&run("wxyz", &a), &b2);
        let right = run(&run("wxyz", &b), &a2);
        assert_eq!(left, right);
        assert_eq!(left, "QRyz");
    }
}
