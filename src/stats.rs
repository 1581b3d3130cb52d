use std::fmt;

use crate::chvec::ChoiceVector;
use crate::error::Result;
use crate::page::{PageId, NO_PAGE};
use crate::relation::{Relation, Stream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStats {
    pub stream: Stream,
    pub id: PageId,
    pub tuple_count: u32,
    pub free_space: usize,
    pub overflow: PageId,
}

/// A snapshot of a relation's global state and every bucket's page chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationStats {
    pub attr_count: u32,
    pub page_count: u32,
    pub tuple_count: u32,
    pub depth: u32,
    pub split_pointer: u32,
    pub choice_vector: ChoiceVector,
    /// Indexed by bucket, primary page first
    pub buckets: Vec<Vec<PageStats>>,
}

impl RelationStats {
    pub fn overflow_pages(&self) -> usize {
        self.buckets.iter().map(|chain| chain.len() - 1).sum()
    }

    pub fn stored_tuples(&self) -> u64 {
        self.buckets
            .iter()
            .flatten()
            .map(|p| p.tuple_count as u64)
            .sum()
    }
}

impl Relation {
    pub async fn stats(&mut self) -> Result<RelationStats> {
        let mut buckets = Vec::with_capacity(self.page_count() as usize);
        for bucket in 0..self.page_count() {
            let mut chain = Vec::new();
            let mut stream = Stream::Data;
            let mut id = bucket;
            loop {
                let page = self.read_page(stream, id).await?;
                chain.push(PageStats {
                    stream,
                    id,
                    tuple_count: page.tuple_count(),
                    free_space: page.free_space(),
                    overflow: page.overflow(),
                });
                if page.overflow() == NO_PAGE {
                    break;
                }
                stream = Stream::Overflow;
                id = page.overflow();
            }
            buckets.push(chain);
        }

        Ok(RelationStats {
            attr_count: self.attr_count(),
            page_count: self.page_count(),
            tuple_count: self.tuple_count(),
            depth: self.depth(),
            split_pointer: self.split_pointer(),
            choice_vector: self.choice_vector().clone(),
            buckets,
        })
    }
}

fn link(id: PageId) -> i64 {
    if id == NO_PAGE {
        -1
    } else {
        id as i64
    }
}

impl fmt::Display for PageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.stream {
            Stream::Data => "d",
            Stream::Overflow => "ov",
        };
        write!(
            f,
            "({}{},{},{},{})",
            prefix,
            self.id,
            self.tuple_count,
            self.free_space,
            link(self.overflow)
        )
    }
}

impl fmt::Display for RelationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Global Info:")?;
        writeln!(
            f,
            "#attrs:{}  #pages:{}  #tuples:{}  d:{}  sp:{}",
            self.attr_count, self.page_count, self.tuple_count, self.depth, self.split_pointer
        )?;
        writeln!(f, "Choice vector")?;
        writeln!(f, "{}", self.choice_vector)?;
        writeln!(f, "Bucket Info:")?;
        writeln!(f, "{:<4} Info on pages in bucket", "#")?;
        writeln!(f, "{:<4} (pageID,#tuples,freebytes,ovflow)", "")?;
        for (bucket, chain) in self.buckets.iter().enumerate() {
            write!(f, "[{:>2}]  ", bucket)?;
            for (i, page) in chain.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", page)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationConfig;
    use crate::consts::PAGE_DATA_SIZE;
    use crate::tuple::Tuple;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stats_walk_chains() {
        let dir = tempdir().unwrap();
        let config = RelationConfig::new(1, 2, 1, None).unwrap();
        let mut rel = Relation::create(dir.path().join("r"), &config).await.unwrap();
        for i in 0..2 {
            rel.add_to_bucket(1, &Tuple::new(format!("{}{}", i, "z".repeat(700))))
                .await
                .unwrap();
        }
        rel.add_to_bucket(0, &Tuple::from("a")).await.unwrap();

        let stats = rel.stats().await.unwrap();
        assert_eq!(stats.buckets.len(), 2);
        assert_eq!(stats.buckets[0].len(), 1);
        assert_eq!(stats.buckets[0][0].free_space, PAGE_DATA_SIZE - 2);
        assert_eq!(stats.buckets[1].len(), 2);
        assert_eq!(stats.buckets[1][0].overflow, 0);
        assert_eq!(stats.buckets[1][1].stream, Stream::Overflow);
        assert_eq!(stats.overflow_pages(), 1);
        assert_eq!(stats.stored_tuples(), 3);

        let text = stats.to_string();
        assert!(text.contains("#attrs:1  #pages:2"));
        assert!(text.contains("[ 0]  (d0,1,1010,-1)"));
        assert!(text.contains("(d1,1,310,0) -> (ov0,1,310,-1)"));
        rel.close().await.unwrap();
    }
}
