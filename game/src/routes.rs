use learn_game::service::{GameOverRequest, MoveRequest};
use learn_game::GameService;
use serde::Deserialize;
use serde_json::{json, Value};

/// One line of input on the request stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Request {
    MakeMove(MoveRequest),
    GameOver(GameOverRequest),
    Stats,
    ResetStats,
}

fn error_reply(message: impl std::fmt::Display) -> Value {
    json!({ "status": "error", "message": message.to_string() })
}

/// Answers a single request line. Malformed input is reported in the reply,
/// never propagated.
pub fn handle_line(service: &GameService, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => return error_reply(format!("bad request: {err}")),
    };
    let reply = match request {
        Request::MakeMove(req) => service.make_move(&req).map(|r| serde_json::to_value(r)),
        Request::GameOver(req) => service.game_over(&req).map(|_| Ok(json!({ "status": "ok" }))),
        Request::Stats => Ok(serde_json::to_value(service.stats())),
        Request::ResetStats => {
            service.reset_stats();
            Ok(Ok(json!({ "status": "ok" })))
        }
    };
    match reply {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => error_reply(err),
        Err(err) => error_reply(err),
    }
}
