use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use itertools::Itertools;

use crate::agent::describe_move;
use crate::model::{Floor, GameState, ALL_FLOORS};
use crate::moves::Move;
use crate::protocol::encode_move;
use crate::search::SearchReport;

/// Castle from the Throne down, with eliminated characters listed apart.
pub fn castle_table(state: &GameState) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Center),
        Cell::new("Floor"),
        Cell::new("Characters"),
        Cell::new("Pts").set_alignment(CellAlignment::Right),
    ]);

    for &floor in ALL_FLOORS.iter().rev() {
        let names = state
            .characters_on_floor(floor)
            .sorted_by_key(|c| c.id)
            .map(|c| format!("{} ({})", c.name(), c.code()))
            .join(", ");
        let names = if names.is_empty() {
            "(empty)".dimmed().to_string()
        } else if floor == Floor::Throne {
            names.yellow().bold().to_string()
        } else {
            names
        };
        table.add_row(vec![
            Cell::new(floor.index()).set_alignment(CellAlignment::Center),
            Cell::new(floor.as_str()),
            Cell::new(names),
            Cell::new(floor.points()).set_alignment(CellAlignment::Right),
        ]);
    }

    let eliminated = state
        .characters
        .iter()
        .filter(|c| c.is_eliminated)
        .map(|c| c.name())
        .join(", ");

    let mut out = format!(
        "  {} {} | {} {}\n{}",
        "Round".bold(),
        state.current_round,
        "Phase".bold(),
        state.current_phase,
        table
    );
    if !eliminated.is_empty() {
        out.push_str(&format!("\n  {} {}", "Eliminated:".red(), eliminated));
    }
    out
}

/// One line announcing a player's move, before it is applied.
pub fn move_line(state: &GameState, player_index: usize, mv: &Move) -> String {
    let label = match mv {
        Move::Placement { .. } => "PLACE".cyan(),
        Move::Ascension { .. } => "PROMOTE".blue(),
        Move::Voting { vote_yes: true } => "YES".green(),
        Move::Voting { vote_yes: false } => "NO".red(),
    };
    format!(
        "  Player {} {} {} {}",
        player_index + 1,
        label.bold(),
        describe_move(state, mv),
        format!("[{}]", encode_move(mv)).dimmed()
    )
}

/// Final ranking with each player's favorites.
pub fn standings_table(state: &GameState) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Rank", "Player", "Score", "No-votes left", "Favorites"]);

    for (rank, player) in state
        .players
        .iter()
        .sorted_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)))
        .enumerate()
    {
        let favorites = player
            .favorites()
            .iter()
            .filter_map(|&id| state.character(id))
            .map(|c| c.name())
            .join(", ");
        let score = if rank == 0 {
            player.score.to_string().green().bold().to_string()
        } else {
            player.score.to_string()
        };
        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Center),
            Cell::new(format!("Player {}", player.id + 1)),
            Cell::new(score).set_alignment(CellAlignment::Right),
            Cell::new(player.no_votes).set_alignment(CellAlignment::Right),
            Cell::new(favorites),
        ]);
    }
    format!("  {}\n{}", "Final standings".bold(), table)
}

/// Root children of a search, most visited first.
pub fn search_table(report: &SearchReport, state: &GameState, limit: usize) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Move", "Wire", "Visits", "Mean score"]);

    for child in report
        .children
        .iter()
        .sorted_by(|a, b| b.visits.cmp(&a.visits))
        .take(limit)
    {
        let is_best = report.best_move == Some(child.mv);
        let description = describe_move(state, &child.mv);
        table.add_row(vec![
            Cell::new(if is_best {
                description.green().bold().to_string()
            } else {
                description
            }),
            Cell::new(encode_move(&child.mv)),
            Cell::new(child.visits).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.3}", child.mean_score)).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "  {} {} iterations | {} nodes | {:.2}s\n{}",
        "Search".bold(),
        report.iterations,
        report.tree_size,
        report.elapsed.as_secs_f64(),
        table
    )
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}
