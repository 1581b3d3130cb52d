use tokio::io::{stdin, AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::select;
use tokio::sync::oneshot::{channel, Receiver};

use crate::command::Command;
use crate::error::Result;
use crate::execute::execute_command;
use crate::relation::Relation;

pub async fn run_repl(relation: &mut Relation) -> Result<()> {
    // Send the receiver to the loop, which selects between
    // waiting for input and waiting for ctrl-c
    let (sender, mut receiver) = channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = sender.send(());
        }
    });

    println!("Welcome to malh! Commands: INSERT <tuple>, SELECT <pattern>, STATS, EXIT");
    let mut reader = BufReader::new(stdin()).lines();
    loop {
        if inner_loop(relation, &mut reader, &mut receiver).await? {
            break;
        }
    }
    println!("Goodbye!");
    Ok(())
}

/// Runs one line of input, returning whether to quit
async fn execute_user_input(relation: &mut Relation, input: Option<String>) -> Result<bool> {
    let Some(input) = input else {
        return Ok(true);
    };
    if input.trim().is_empty() {
        return Ok(false);
    }

    match input.parse::<Command>() {
        Err(err) => println!("Error: {}", err),
        Ok(Command::Exit) => return Ok(true),
        Ok(cmd) => match execute_command(relation, cmd).await {
            Ok(output) => println!("{}", output),
            // Bad tuples and patterns leave the relation usable
            Err(err @ (crate::MalhError::Config(_) | crate::MalhError::Capacity { .. })) => {
                println!("Error: {}", err)
            }
            Err(err) => return Err(err),
        },
    }
    Ok(false)
}

async fn inner_loop<R: AsyncRead + Unpin>(
    relation: &mut Relation,
    reader: &mut Lines<BufReader<R>>,
    receiver: &mut Receiver<()>,
) -> Result<bool> {
    select! {
        _ = &mut *receiver => {
            println!("Received ctrl-c");
            execute_user_input(relation, Some("EXIT".into())).await
        }
        input = reader.next_line() => {
            execute_user_input(relation, input?).await
        }
    }
}
