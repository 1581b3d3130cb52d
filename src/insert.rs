use tracing::debug;

use crate::config::split_threshold;
use crate::consts::PAGE_DATA_SIZE;
use crate::error::{MalhError, Result};
use crate::page::{PageId, NO_PAGE};
use crate::relation::{Relation, Stream};
use crate::tuple::Tuple;

impl Relation {
    /// Inserts a tuple and returns the bucket it was added to
    ///
    /// The tuple lands on the bucket's primary page, the first page of its overflow
    /// chain with room, or a new overflow page linked at the end of the chain.
    /// Every `PAGE_SIZE / (10 * attrs)` insertions across the whole relation
    /// trigger one [Relation::split].
    pub async fn insert(&mut self, tuple: &Tuple) -> Result<PageId> {
        self.ensure_writable()?;
        tuple.validate(self.attr_count())?;
        if tuple.stored_len() > PAGE_DATA_SIZE {
            return Err(MalhError::Capacity {
                len: tuple.stored_len(),
                capacity: PAGE_DATA_SIZE,
            });
        }

        let bucket = self.bucket_of(self.tuple_hash(tuple));
        self.add_to_bucket(bucket, tuple).await?;
        self.tuple_count += 1;

        if self.tuple_count % split_threshold(self.attr_count()) == 0 {
            self.split().await?;
        }
        Ok(bucket)
    }

    /// Appends to the bucket without counting the tuple or checking for a split
    pub(crate) async fn add_to_bucket(&mut self, bucket: PageId, tuple: &Tuple) -> Result<()> {
        let mut stream = Stream::Data;
        let mut id = bucket;
        let mut page = self.read_page(Stream::Data, bucket).await?;

        loop {
            if page.add_tuple(tuple).is_ok() {
                return self.write_page(stream, id, &page).await;
            }
            match page.overflow() {
                NO_PAGE => break,
                next => {
                    stream = Stream::Overflow;
                    id = next;
                    page = self.read_page(Stream::Overflow, next).await?;
                }
            }
        }

        // Every page in the chain is full
        let new_id = self.new_overflow_page(tuple).await?;
        page.set_overflow(new_id);
        self.write_page(stream, id, &page).await?;
        debug!(bucket, overflow = new_id, "chained overflow page");
        Ok(())
    }

    async fn new_overflow_page(&mut self, tuple: &Tuple) -> Result<PageId> {
        let id = self.ovflow.allocate_page().await?;
        let mut page = self.read_page(Stream::Overflow, id).await?;
        page.add_tuple(tuple).map_err(|_| MalhError::Capacity {
            len: tuple.stored_len(),
            capacity: PAGE_DATA_SIZE,
        })?;
        self.write_page(Stream::Overflow, id, &page).await?;
        Ok(id)
    }
}
