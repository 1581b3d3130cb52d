use tokio::io::{stdin, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::{MalhError, Result};
use crate::relation::Relation;
use crate::tuple::Tuple;

/// Inserts one tuple per line of stdin, stopping early on Ctrl-C
///
/// Returns the number of tuples inserted.
pub async fn insert_from_stdin(relation: &mut Relation) -> Result<u64> {
    let (ctrlc_send, mut ctrlc_recv) = oneshot::channel::<()>();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrlc_send.send(());
        }
    });
    insert_lines(relation, BufReader::new(stdin()), &mut ctrlc_recv).await
}

/// Feeds lines from `reader` through a channel into [Relation::insert]
///
/// Tuples the relation rejects as malformed are logged and skipped; I/O errors
/// stop the load.
pub async fn insert_lines<R>(
    relation: &mut Relation,
    reader: BufReader<R>,
    ctrlc_signal: &mut oneshot::Receiver<()>,
) -> Result<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (send, mut recv) = mpsc::channel::<String>(100);
    let read_task = tokio::spawn(async move { read_lines(reader, &send).await });

    let mut inserted = 0;
    let mut interrupted = false;
    loop {
        select! {
            _ = &mut *ctrlc_signal => {
                warn!(inserted, "interrupted, stopping insert");
                interrupted = true;
                break;
            }
            line = recv.recv() => {
                let Some(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match relation.insert(&Tuple::new(line)).await {
                    Ok(_) => inserted += 1,
                    Err(err @ (MalhError::Config(_) | MalhError::Capacity { .. })) => {
                        warn!(tuple = line, %err, "skipping tuple");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
    if interrupted {
        read_task.abort();
    } else {
        read_task
            .await
            .map_err(|err| MalhError::Io(std::io::Error::other(err)))??;
    }

    info!(inserted, "insert finished");
    Ok(inserted)
}

async fn read_lines<R: AsyncRead + Unpin>(
    reader: BufReader<R>,
    send: &mpsc::Sender<String>,
) -> Result<()> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if send.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}
