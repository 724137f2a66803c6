use serde::Serialize;

/// Columns projected for every summary read.
pub const SUMMARY_COLUMNS: &str =
    "id,player0_id,player1_id,status,current_turn_player_id,is_correspondence";
/// Remote procedure answering which slot is to move in a match.
pub const CURRENT_PLAYER_RPC: &str = "rpc/get_current_player_for_match";
/// Row filter excluding finished matches.
pub const NOT_GAMEOVER_FILTER: &str = "neq.GAMEOVER";

/// Filter expression selecting one row by id.
pub fn id_filter(match_id: &str) -> String {
    format!("eq.{match_id}")
}

#[derive(Debug, Serialize)]
pub struct CurrentPlayerArgs<'a> {
    pub match_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CurrentTurnPatch<'a> {
    pub current_turn_player_id: &'a str,
}
