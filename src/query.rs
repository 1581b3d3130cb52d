//! Partial-match queries
//!
//! A pattern such as `a,?,x` fixes some bits of the composite hash (`known`)
//! and leaves the bits drawn from wildcard attributes open (`unknown`). Every
//! bucket whose address agrees with the known bits is a candidate, and the scan
//! walks each candidate's primary page and overflow chain in turn.

use tracing::trace;

use crate::bits::*;
use crate::consts::MAX_CHVEC;
use crate::error::{MalhError, Result};
use crate::hash::hash_bytes;
use crate::page::{PageId, NO_PAGE};
use crate::relation::{Relation, Stream};
use crate::tuple::{Pattern, PatternAttr, Tuple};

/// Position of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    /// Index into the candidate list, `None` before the first call
    candidate: Option<usize>,
    page: PageId,
    in_overflow: bool,
    /// Byte offset of the next tuple to test within `page`
    offset: usize,
    done: bool,
}

impl Cursor {
    fn new() -> Self {
        Self {
            candidate: None,
            page: NO_PAGE,
            in_overflow: false,
            offset: 0,
            done: false,
        }
    }
}

/// A scan over the tuples of a relation that match a pattern
pub struct Query<'r> {
    relation: &'r mut Relation,
    pattern: Pattern,
    known: Bits,
    unknown: Bits,
    candidates: Vec<PageId>,
    cursor: Cursor,
}

/// Splits a pattern into the composite hash bits it fixes and those it leaves open
pub fn pattern_bits(relation: &Relation, pattern: &Pattern) -> (Bits, Bits) {
    let hashes: Vec<Option<Bits>> = pattern
        .attrs()
        .iter()
        .map(|attr| match attr {
            PatternAttr::Literal(value) => Some(hash_bytes(value.as_bytes())),
            PatternAttr::Wildcard => None,
        })
        .collect();

    let mut known = 0;
    let mut unknown = 0;
    for i in 0..MAX_CHVEC {
        let (attr, bit) = relation.choice_vector().resolve(i);
        match hashes.get(attr).copied().flatten() {
            None => unknown = set_bit(unknown, i),
            Some(hash) if bit_is_set(hash, bit) => known = set_bit(known, i),
            Some(_) => {}
        }
    }
    (known, unknown)
}

/// Every bucket that can hold a tuple agreeing with `known` on the bits not in `unknown`
///
/// Addresses are enumerated over the low `depth + 1` bits, branching on each unknown
/// bit from the most significant down with the 0 branch first. An address whose low
/// `depth` bits are at or past the split pointer names a bucket that has not been
/// split yet, so it is folded onto that bucket; the fold that would repeat a bucket
/// already produced by the 0 branch is dropped.
pub fn candidate_buckets(known: Bits, unknown: Bits, depth: u32, split_pointer: u32) -> Vec<PageId> {
    let width = depth + 1;
    let mut candidates = Vec::new();
    let mut stack = vec![(lower_bits(known, width), lower_bits(unknown, width))];

    while let Some((address, open)) = stack.pop() {
        if open != 0 {
            let bit = (Bits::BITS - 1 - open.leading_zeros()) as usize;
            let rest = unset_bit(open, bit);
            stack.push((set_bit(address, bit), rest));
            stack.push((address, rest));
            continue;
        }

        // Reject addresses that contradict a known bit
        let merged = address | known;
        if merged < known || merged > (known | unknown) {
            continue;
        }

        let low = lower_bits(address, depth);
        if low < split_pointer {
            candidates.push(address);
        } else if !(bit_is_set(address, depth as usize) && bit_is_set(unknown, depth as usize)) {
            candidates.push(low);
        }
    }
    candidates
}

impl<'r> Query<'r> {
    /// Resolves `pattern` against the relation's current addressing state
    ///
    /// Fails with [MalhError::Config] if the pattern's attribute count differs from
    /// the relation's.
    pub fn start(relation: &'r mut Relation, pattern: &str) -> Result<Self> {
        let pattern = Pattern::parse(pattern);
        if pattern.attrs().len() != relation.attr_count() as usize {
            return Err(MalhError::Config(format!(
                "pattern {:?} has {} attributes, relation has {}",
                pattern.as_str(),
                pattern.attrs().len(),
                relation.attr_count()
            )));
        }

        let (known, unknown) = pattern_bits(relation, &pattern);
        let candidates =
            candidate_buckets(known, unknown, relation.depth(), relation.split_pointer());
        trace!(
            pattern = pattern.as_str(),
            known = %bits_string(known),
            unknown = %bits_string(unknown),
            ?candidates,
            "resolved query"
        );

        Ok(Self {
            relation,
            pattern,
            known,
            unknown,
            candidates,
            cursor: Cursor::new(),
        })
    }

    pub fn known(&self) -> Bits {
        self.known
    }

    pub fn unknown(&self) -> Bits {
        self.unknown
    }

    pub fn candidates(&self) -> &[PageId] {
        &self.candidates
    }

    /// Moves to candidate `index`, ending the scan if there is none or it is not
    /// materialized yet. Later candidates are not tried once one is out of range.
    fn seek_candidate(&mut self, index: usize) {
        self.cursor.candidate = Some(index);
        self.cursor.in_overflow = false;
        self.cursor.offset = 0;
        match self.candidates.get(index) {
            Some(&bucket) if bucket < self.relation.page_count() => self.cursor.page = bucket,
            _ => self.cursor.done = true,
        }
    }

    /// The next matching tuple, or `None` once the scan is over
    pub async fn next_tuple(&mut self) -> Result<Option<Tuple>> {
        if self.cursor.candidate.is_none() && !self.cursor.done {
            self.seek_candidate(0);
        }

        while !self.cursor.done {
            let stream = if self.cursor.in_overflow {
                Stream::Overflow
            } else {
                Stream::Data
            };
            let page = self.relation.read_page(stream, self.cursor.page).await?;

            while let Some((tuple, next)) = page.tuple_at(self.cursor.offset) {
                self.cursor.offset = next;
                if tuple.matches(&self.pattern) {
                    return Ok(Some(tuple));
                }
            }

            match page.overflow() {
                NO_PAGE => {
                    let next = self.cursor.candidate.map_or(0, |i| i + 1);
                    self.seek_candidate(next);
                }
                overflow => {
                    self.cursor.page = overflow;
                    self.cursor.in_overflow = true;
                    self.cursor.offset = 0;
                }
            }
        }
        Ok(None)
    }

    /// Drains the remaining matches
    pub async fn collect(&mut self) -> Result<Vec<Tuple>> {
        let mut tuples = Vec::new();
        while let Some(tuple) = self.next_tuple().await? {
            tuples.push(tuple);
        }
        Ok(tuples)
    }

    /// Releases the query, the relation is untouched
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationConfig;
    use tempfile::tempdir;

    #[test]
    fn all_known_gives_one_candidate() {
        // depth 2, nothing split yet: only the low 2 bits matter
        assert_eq!(candidate_buckets(0b101, 0, 2, 0), vec![0b01]);
        // bucket 1 is below the split pointer, so bit 2 picks the buddy
        assert_eq!(candidate_buckets(0b101, 0, 2, 2), vec![0b101]);
        assert_eq!(candidate_buckets(0b001, 0, 2, 2), vec![0b001]);
    }

    #[test]
    fn unknown_bits_enumerate_in_order() {
        // bits 0 and 1 open, bit 2 known set, nothing split
        assert_eq!(candidate_buckets(0b100, 0b011, 2, 0), vec![0, 1, 2, 3]);
        // split pointer at 2: buckets 0 and 1 need bit 2, which is set
        assert_eq!(candidate_buckets(0b100, 0b011, 2, 2), vec![4, 5, 2, 3]);
    }

    #[test]
    fn open_top_bit_does_not_repeat_buckets() {
        let all = u32::MAX;
        assert_eq!(candidate_buckets(0, all, 2, 0), vec![0, 1, 2, 3]);
        assert_eq!(candidate_buckets(0, all, 2, 1), vec![0, 1, 2, 3, 4]);
        assert_eq!(candidate_buckets(0, all, 0, 0), vec![0]);
    }

    #[test]
    fn bits_beyond_window_are_ignored() {
        assert_eq!(
            candidate_buckets(0xFFFF_FF00, 0x00FF_0000, 1, 0),
            vec![0]
        );
    }

    async fn relation(dir: &tempfile::TempDir) -> Relation {
        let config = RelationConfig::new(2, 4, 2, None).unwrap();
        Relation::create(dir.path().join("r"), &config).await.unwrap()
    }

    #[tokio::test]
    async fn pattern_arity_is_checked() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir).await;
        assert!(matches!(
            Query::start(&mut rel, "a,?,?"),
            Err(MalhError::Config(_))
        ));
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn known_and_unknown_are_disjoint() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir).await;
        let query = Query::start(&mut rel, "a,?").unwrap();
        assert_eq!(query.known() & query.unknown(), 0);
        // round robin over two attributes: odd composite bits come from attribute 1
        assert_eq!(query.unknown(), 0xAAAA_AAAA);
        query.close();

        let query = Query::start(&mut rel, "?,?").unwrap();
        assert_eq!(query.unknown(), u32::MAX);
        assert_eq!(query.known(), 0);
        assert_eq!(query.candidates(), &[0, 1, 2, 3]);
        query.close();
        rel.close().await.unwrap();
    }

    // Known edge case: the scan halts at the first candidate that is not yet
    // materialized, even when a later candidate is.
    #[tokio::test]
    async fn scan_stops_at_first_unmaterialized_candidate() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir).await;
        rel.add_to_bucket(0, &Tuple::from("p,0")).await.unwrap();
        rel.add_to_bucket(1, &Tuple::from("q,1")).await.unwrap();

        let mut query = Query::start(&mut rel, "?,?").unwrap();
        query.candidates = vec![0, 99, 1];
        assert_eq!(query.next_tuple().await.unwrap(), Some(Tuple::from("p,0")));
        assert_eq!(query.next_tuple().await.unwrap(), None);
        assert_eq!(query.next_tuple().await.unwrap(), None);
        query.close();

        let mut query = Query::start(&mut rel, "?,?").unwrap();
        query.candidates = vec![99, 0];
        assert_eq!(query.next_tuple().await.unwrap(), None);
        query.close();
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn scan_follows_overflow_chain() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir).await;
        let big = |i: usize| Tuple::new(format!("{},{}", i, "y".repeat(600)));
        for i in 0..3 {
            rel.add_to_bucket(2, &big(i)).await.unwrap();
        }
        rel.add_to_bucket(2, &Tuple::from("small,z")).await.unwrap();

        let mut query = Query::start(&mut rel, "?,?").unwrap();
        query.candidates = vec![2];
        let found = query.collect().await.unwrap();
        assert_eq!(found, vec![big(0), Tuple::from("small,z"), big(1), big(2)]);
        query.close();
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_candidate_list_ends_immediately() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir).await;
        let mut query = Query::start(&mut rel, "?,?").unwrap();
        query.candidates.clear();
        assert_eq!(query.next_tuple().await.unwrap(), None);
        query.close();
        rel.close().await.unwrap();
    }
}
