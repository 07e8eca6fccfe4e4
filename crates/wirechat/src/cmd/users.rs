use wirechat_session::{Event, SessionConfig, User};

use crate::cmd::{connect, disconnect_error, parse_duration, Connection, UsersArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_users, OutputFormat};

pub async fn run(args: UsersArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.server.timeout)?;
    let Connection {
        client,
        mut events,
        early,
    } = connect(&args.server, SessionConfig::default()).await?;

    let users = match first_user_list(early) {
        Some(users) => Ok(users),
        None => wait_for_users(&mut events, timeout).await,
    };

    if let Err(err) = client.disconnect().await {
        tracing::debug!(error = %err, "disconnect after user list");
    }
    client.shutdown().await;

    print_users(&users?, format);
    Ok(SUCCESS)
}

fn first_user_list(events: Vec<Event>) -> Option<Vec<User>> {
    events.into_iter().find_map(|event| match event {
        Event::UserListUpdated { users } => Some(users),
        _ => None,
    })
}

async fn wait_for_users(
    events: &mut tokio::sync::mpsc::Receiver<Event>,
    timeout: std::time::Duration,
) -> CliResult<Vec<User>> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(Event::UserListUpdated { users })) => return Ok(users),
            Ok(Some(Event::Disconnected { reason })) => return Err(disconnect_error(&reason)),
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                return Err(CliError::new(TIMEOUT, "no user list received"));
            }
        }
    }
}
