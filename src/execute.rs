use crate::command::Command;
use crate::error::Result;
use crate::query::Query;
use crate::relation::Relation;

/// Runs one command and returns the text to show the user
pub async fn execute_command(relation: &mut Relation, cmd: Command) -> Result<String> {
    match cmd {
        Command::Insert(tuple) => {
            let bucket = relation.insert(&tuple).await?;
            Ok(format!("inserted into bucket {}", bucket))
        }
        Command::Select(pattern) => {
            let mut query = Query::start(relation, &pattern)?;
            let mut lines = Vec::new();
            while let Some(tuple) = query.next_tuple().await? {
                lines.push(tuple.to_string());
            }
            query.close();
            lines.push(format!("({} tuples)", lines.len()));
            Ok(lines.join("\n"))
        }
        Command::Stats => Ok(relation.stats().await?.to_string()),
        Command::Exit => Ok(String::new()),
    }
}
