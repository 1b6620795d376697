use crate::error::EngineError;
use crate::messages::{self, OutputMessage};
use crate::workflow::Workflow;
use core_types::Holding;
use rand::seq::SliceRandom;
use rand::Rng;

/// GME, BB, CLOV, AMC, PLTR, WISH, NIO, TSLA, Tilray, NOK.
pub const MEME_ISINS: [&str; 10] = [
    "US36467W1099",
    "CA09228F1036",
    "US18914F1030",
    "US00165C1045",
    "US69608A1088",
    "US21077C1071",
    "US62914V1061",
    "US88160R1014",
    "US88688T1007",
    "FI0009000681",
];

pub fn pick_meme<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MEME_ISINS.choose(rng).copied().unwrap_or(MEME_ISINS[0])
}

/// One block per non-empty holding, ordered by title.
pub fn format_positions(holdings: impl IntoIterator<Item = Holding>) -> String {
    let mut held: Vec<Holding> = holdings.into_iter().filter(|h| h.quantity > 0).collect();
    if held.is_empty() {
        return messages::NO_POSITIONS.to_string();
    }
    held.sort_by(|a, b| a.title.cmp(&b.title));
    held.iter()
        .map(|h| {
            format!(
                "Name: {}\nQuantity: {}\nAverage Price: €{}",
                h.title, h.quantity, h.average_buy_price
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl Workflow {
    /// `/positions`. Leaves the conversation untouched, even on failure.
    pub(crate) async fn positions(&self) -> OutputMessage {
        match self.load_positions().await {
            Ok(text) => OutputMessage::text(text),
            Err(e) => {
                tracing::error!(error = ?e, "Failed to load positions.");
                OutputMessage::text(messages::POSITIONS_FAILED)
            }
        }
    }

    async fn load_positions(&self) -> Result<String, EngineError> {
        let space_id = self.default_space().await?;
        let positions = self.api_client.get_positions(&space_id).await?;
        Ok(format_positions(positions.into_values()))
    }

    /// `/moon`: names a random meme stock.
    pub(crate) async fn to_the_moon(&self) -> OutputMessage {
        let isin = pick_meme(&mut rand::thread_rng());
        match self.api_client.get_instrument_title(isin).await {
            Ok(title) => OutputMessage::text(format!("{} to the moon 🚀", title)),
            Err(e) => {
                tracing::error!(isin, error = ?e, "Failed to look up meme stock.");
                OutputMessage::text(messages::MOON_FAILED)
            }
        }
    }
}
