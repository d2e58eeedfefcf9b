use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, info};

use super::error::{MongoDaoError, MongoResult};

const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Delay before ping number `attempt + 1`, doubling up to [`MAX_PING_DELAY`].
fn ping_delay(attempt: u32) -> Duration {
    FIRST_PING_DELAY
        .saturating_mul(1 << attempt.saturating_sub(1).min(16))
        .min(MAX_PING_DELAY)
}

/// Open the room store database and wait until it answers a ping.
///
/// The supervisor owns long-term retries, so this only rides out a server
/// that is still starting.
pub async fn connect_room_database(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone()).map_err(|source| {
        MongoDaoError::ClientConstruction {
            database: database_name.to_owned(),
            source,
        }
    })?;
    let database = client.database(database_name);

    let mut attempt = 0;
    loop {
        attempt += 1;
        let Err(source) = database.run_command(doc! { "ping": 1 }).await else {
            break;
        };
        if attempt >= PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                database: database_name.to_owned(),
                attempts: attempt,
                source,
            });
        }
        let delay = ping_delay(attempt);
        debug!(
            database = database_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "room store not answering yet"
        );
        sleep(delay).await;
    }

    info!(database = database_name, attempts = attempt, "room store database reachable");
    Ok((client, database))
}
