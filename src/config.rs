use crate::chvec::ChoiceVector;
use crate::consts::*;
use crate::error::MalhError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        self == OpenMode::ReadWrite
    }
}

/// Parameters for creating a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationConfig {
    pub attr_count: u32,
    pub initial_pages: u32,
    pub depth: u32,
    pub choice_vector: ChoiceVector,
}

impl RelationConfig {
    /// Parses the textual choice vector, falling back to [ChoiceVector::round_robin]
    pub fn new(
        attr_count: u32,
        initial_pages: u32,
        depth: u32,
        choice_vector: Option<&str>,
    ) -> Result<Self, MalhError> {
        let choice_vector = match choice_vector {
            Some(spec) => spec.parse::<ChoiceVector>().map_err(|err| match err {
                MalhError::Parse(msg) => MalhError::Config(msg),
                other => other,
            })?,
            None => ChoiceVector::round_robin(attr_count),
        };
        let config = Self {
            attr_count,
            initial_pages,
            depth,
            choice_vector,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MalhError> {
        if self.attr_count == 0 || self.attr_count > MAX_ATTRS {
            return Err(MalhError::Config(format!(
                "attribute count must be between 1 and {}, got {}",
                MAX_ATTRS, self.attr_count
            )));
        }
        if self.depth as usize >= MAX_CHVEC {
            return Err(MalhError::Config(format!(
                "depth must be below {}, got {}",
                MAX_CHVEC, self.depth
            )));
        }
        if (self.initial_pages as u64) < 1_u64 << self.depth {
            return Err(MalhError::Config(format!(
                "{} initial pages cannot cover depth {} ({} buckets)",
                self.initial_pages,
                self.depth,
                1_u64 << self.depth
            )));
        }
        self.choice_vector.validate(self.attr_count)
    }
}

/// Tuples inserted between two splits
pub fn split_threshold(attr_count: u32) -> u32 {
    (PAGE_SIZE as u32 / (10 * attr_count)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_round_robin() {
        let config = RelationConfig::new(3, 4, 2, None).unwrap();
        assert_eq!(config.choice_vector, ChoiceVector::round_robin(3));
    }

    #[test]
    fn bad_choice_vector_is_config_error() {
        assert!(matches!(
            RelationConfig::new(3, 4, 2, Some("0.0,1.1")),
            Err(MalhError::Config(_))
        ));
        let cv = ChoiceVector::round_robin(4).to_string();
        assert!(matches!(
            RelationConfig::new(3, 4, 2, Some(&cv)),
            Err(MalhError::Config(_))
        ));
    }

    #[test]
    fn pages_must_cover_depth() {
        assert!(RelationConfig::new(3, 3, 2, None).is_err());
        assert!(RelationConfig::new(3, 4, 2, None).is_ok());
        assert!(RelationConfig::new(3, 9, 3, None).is_ok());
    }

    #[test]
    fn attribute_count_range() {
        assert!(RelationConfig::new(0, 1, 0, None).is_err());
        assert!(RelationConfig::new(MAX_ATTRS + 1, 1, 0, None).is_err());
        assert!(RelationConfig::new(MAX_ATTRS, 1, 0, None).is_ok());
    }

    #[test]
    fn threshold_uses_page_size() {
        assert_eq!(split_threshold(3), 34);
        assert_eq!(split_threshold(1), 102);
        assert_eq!(split_threshold(MAX_ATTRS), 1);
    }
}
