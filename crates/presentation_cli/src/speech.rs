//! Spanish voice summary of nearby arrivals

use std::collections::HashSet;

use integration_emt::{Eta, NearbyArrival};

/// Spoken when nothing is arriving
pub const NO_ARRIVALS: &str = "No hay autobuses llegando a paradas cercanas en este momento.";

/// Summarize arrivals in one sentence, mentioning each line once
///
/// Arrivals are expected soonest first, so the first mention of a line is
/// its next bus.
pub fn format_arrivals(arrivals: &[NearbyArrival]) -> String {
    let mut mentioned = HashSet::new();
    let parts: Vec<String> = arrivals
        .iter()
        .filter(|a| mentioned.insert(a.arrival.line.as_str()))
        .map(describe)
        .collect();

    match parts.as_slice() {
        [] => NO_ARRIVALS.to_string(),
        [only] => format!("{only}."),
        [first, second] => format!("{first} y {second}."),
        [init @ .., last] => format!("{}, y {last}.", init.join(", ")),
    }
}

fn describe(arrival: &NearbyArrival) -> String {
    let line = &arrival.arrival.line;
    let when = match arrival.arrival.minutes {
        Eta::Minutes(0) => "llegando ahora".to_string(),
        Eta::Minutes(1) => "en 1 minuto".to_string(),
        Eta::Minutes(m) => format!("en {m} minutos"),
        Eta::Unknown => "sin hora estimada".to_string(),
    };

    match arrival.stop_name.as_deref().filter(|s| !s.is_empty()) {
        Some(stop) => format!("Línea {line} {when} en {stop}"),
        None => format!("Línea {line} {when}"),
    }
}
