//! Operator command surface. Each command reads or writes exactly one
//! piece of shared state and replies with a formatted confirmation.

use chrono::Utc;
use tracing::{info, warn};

use crate::config::BotConfig;
use crate::state::AppState;
use crate::telegram::{Message, TelegramClient};

const HELP_TEXT: &str = "📚 **COMMANDES DU BOT**\n\n\
🔹 /start : Affiche cette liste de commandes.\n\
🔹 /status : État du bot (dernier numéro, bilan, throttles).\n\
🔹 /offset <n> : Régler le décalage du numéro prédit.\n\
🔹 /dif <♠️♦️> <❤️♣️> : Régler les seuils de différence miroir.\n\
🔹 /inv <min> : Intervalle des rapports (0 pour désactiver).";

const RESTRICTED: &str = "⛔ Commande réservée à l'opérateur.";
const INVALID_NUMBER: &str = "Veuillez entrer un nombre valide.";

pub async fn handle_command(
    app: &mut AppState,
    tg: &TelegramClient,
    config: &BotConfig,
    msg: &Message,
    text: &str,
) {
    let mut parts = text.split_whitespace();
    let Some(command) = parts.next() else {
        return;
    };
    // "/status@botname" arrives in groups.
    let command = command.split('@').next().unwrap_or(command);

    let reply = match command {
        "/start" | "/help" => HELP_TEXT.to_string(),
        "/status" | "/info" => app.format_status(Utc::now()),
        "/offset" => {
            if !is_operator(config, msg) {
                RESTRICTED.to_string()
            } else {
                match parts.next().and_then(|v| v.parse::<u64>().ok()) {
                    Some(offset) => {
                        app.game_offset = offset;
                        info!("Game offset set to +{}", offset);
                        format!("✅ Décalage de prédiction réglé à +{}", offset)
                    }
                    None => INVALID_NUMBER.to_string(),
                }
            }
        }
        "/dif" => {
            if !is_operator(config, msg) {
                RESTRICTED.to_string()
            } else {
                let spade_diamond = parts.next().and_then(|v| v.parse::<u32>().ok());
                let heart_club = parts.next().and_then(|v| v.parse::<u32>().ok());
                match (spade_diamond, heart_club) {
                    (Some(sd), Some(hc)) => {
                        app.spade_diamond_threshold = sd;
                        app.heart_club_threshold = hc;
                        info!("Mirror thresholds set to ♠♦={} ♥♣={}", sd, hc);
                        format!("✅ Seuils miroirs réglés : ♠️↔♦️ = {} | ❤️↔♣️ = {}", sd, hc)
                    }
                    _ => "Usage : /dif <seuil ♠️♦️> <seuil ❤️♣️>".to_string(),
                }
            }
        }
        "/inv" => {
            if !is_operator(config, msg) {
                RESTRICTED.to_string()
            } else {
                match parts.next().and_then(|v| v.parse::<u64>().ok()) {
                    Some(minutes) => {
                        app.report_interval_min = minutes;
                        info!("Report interval set to {} min", minutes);
                        if minutes > 0 {
                            format!("✅ Intervalle de rapport : {} min", minutes)
                        } else {
                            "✅ Rapports périodiques désactivés.".to_string()
                        }
                    }
                    None => INVALID_NUMBER.to_string(),
                }
            }
        }
        _ => return,
    };

    if let Err(e) = tg.send_message(msg.chat.id, &reply).await {
        warn!("Command reply failed: {}", e);
    }
}

fn is_operator(config: &BotConfig, msg: &Message) -> bool {
    match config.telegram.admin_id {
        Some(admin) => {
            msg.from.as_ref().map_or(false, |user| user.id == admin) || msg.chat.id == admin
        }
        None => true,
    }
}
