use super::{Replay, load_population};
use anyhow::Result;
use orniscope_core::EngineSettings;
use std::path::Path;

const SESSION_ID: &str = "cli-types";

pub async fn run(population: &Path, settings: EngineSettings) -> Result<()> {
    let replay = Replay::from_fixture(load_population(population)?, settings);
    let session = replay.manager.attach(SESSION_ID).await;

    let types = session.get_entity_types().await;
    replay.manager.detach(SESSION_ID).await;

    for entity_type in types? {
        println!("{}", entity_type);
    }
    Ok(())
}
