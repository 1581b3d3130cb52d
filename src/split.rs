use tracing::debug;

use crate::bits::lower_bits;
use crate::error::Result;
use crate::page::{Page, PageId, NO_PAGE};
use crate::relation::{Relation, Stream};

impl Relation {
    /// Splits the bucket at the split pointer
    ///
    /// Its tuples are spread over the old bucket and its buddy `sp + 2^depth`
    /// using one more bit of the hash. The old chain's overflow pages are emptied
    /// and left unlinked. When the split pointer wraps, the depth grows by one.
    pub async fn split(&mut self) -> Result<()> {
        self.ensure_writable()?;
        let old_id = self.split_pointer;
        let depth = self.depth;
        let new_id = old_id + (1 << depth);

        if new_id == self.page_count {
            self.write_page(Stream::Data, new_id, &Page::new()).await?;
            self.page_count += 1;
        }

        let old_page = self.read_page(Stream::Data, old_id).await?;
        self.write_page(Stream::Data, old_id, &Page::new()).await?;
        let mut moved = self.redistribute(&old_page, old_id, new_id).await?;

        let mut next = old_page.overflow();
        while next != NO_PAGE {
            let page = self.read_page(Stream::Overflow, next).await?;
            self.write_page(Stream::Overflow, next, &Page::new()).await?;
            moved += self.redistribute(&page, old_id, new_id).await?;
            next = page.overflow();
        }

        self.split_pointer += 1;
        if self.split_pointer as u64 == 1_u64 << self.depth {
            self.depth += 1;
            self.split_pointer = 0;
        }

        debug!(
            old = old_id,
            new = new_id,
            moved,
            depth = self.depth,
            split_pointer = self.split_pointer,
            pages = self.page_count,
            "split bucket"
        );
        Ok(())
    }

    /// Re-adds the tuples of `page` to the old or new bucket, returning how many moved
    async fn redistribute(&mut self, page: &Page, old_id: PageId, new_id: PageId) -> Result<u32> {
        let mut moved = 0;
        for tuple in page.tuples() {
            let hash = self.tuple_hash(&tuple);
            if lower_bits(hash, self.depth + 1) == new_id {
                self.add_to_bucket(new_id, &tuple).await?;
                moved += 1;
            } else {
                self.add_to_bucket(old_id, &tuple).await?;
            }
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationConfig;
    use crate::tuple::Tuple;
    use tempfile::tempdir;

    async fn relation(dir: &tempfile::TempDir, attrs: u32, pages: u32, depth: u32) -> Relation {
        let config = RelationConfig::new(attrs, pages, depth, None).unwrap();
        Relation::create(dir.path().join("r"), &config).await.unwrap()
    }

    fn sorted(mut tuples: Vec<Tuple>) -> Vec<Tuple> {
        tuples.sort();
        tuples
    }

    #[tokio::test]
    async fn split_conserves_tuples() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir, 2, 1, 0).await;
        // Threshold for 2 attributes is 51, stay below it
        for i in 0..40 {
            rel.add_to_bucket(0, &Tuple::new(format!("k{},v{}", i, i)))
                .await
                .unwrap();
        }
        let before = sorted(rel.bucket_tuples(0).await.unwrap());
        assert_eq!(before.len(), 40);

        rel.split().await.unwrap();
        assert_eq!(rel.page_count(), 2);
        assert_eq!(rel.depth(), 1);
        assert_eq!(rel.split_pointer(), 0);

        let zero = rel.bucket_tuples(0).await.unwrap();
        let one = rel.bucket_tuples(1).await.unwrap();
        for t in &zero {
            assert_eq!(lower_bits(rel.tuple_hash(t), 1), 0);
        }
        for t in &one {
            assert_eq!(lower_bits(rel.tuple_hash(t), 1), 1);
        }
        let mut after = zero;
        after.extend(one);
        assert_eq!(sorted(after), before);
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn drained_overflow_pages_stay_allocated() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir, 1, 1, 0).await;
        let big = |i: usize| Tuple::new(format!("{}{}", i, "x".repeat(600)));
        for i in 0..3 {
            rel.add_to_bucket(0, &big(i)).await.unwrap();
        }
        assert_eq!(rel.overflow_page_count(), 2);

        rel.split().await.unwrap();
        // Old chain pages are emptied, new pages come from the end of the file
        for id in 0..2 {
            let page = rel.read_page(Stream::Overflow, id).await.unwrap();
            assert_eq!(page.tuple_count(), 0);
        }
        let mut after = rel.bucket_tuples(0).await.unwrap();
        after.extend(rel.bucket_tuples(1).await.unwrap());
        assert_eq!(sorted(after), sorted((0..3).map(big).collect()));
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn pointer_walks_then_depth_grows() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir, 3, 4, 2).await;

        for expected_sp in 1..4 {
            rel.split().await.unwrap();
            assert_eq!(rel.depth(), 2);
            assert_eq!(rel.split_pointer(), expected_sp);
            assert_eq!(rel.page_count(), 4 + expected_sp);
        }
        rel.split().await.unwrap();
        assert_eq!(rel.depth(), 3);
        assert_eq!(rel.split_pointer(), 0);
        assert_eq!(rel.page_count(), 8);
        rel.close().await.unwrap();
    }

    #[tokio::test]
    async fn preallocated_buddy_is_reused() {
        let dir = tempdir().unwrap();
        let mut rel = relation(&dir, 3, 6, 2).await;
        rel.split().await.unwrap();
        // Buddy 4 already existed
        assert_eq!(rel.page_count(), 6);
        rel.split().await.unwrap();
        assert_eq!(rel.page_count(), 6);
        rel.split().await.unwrap();
        // Buddy 6 is new
        assert_eq!(rel.page_count(), 7);
        rel.close().await.unwrap();
    }
}
