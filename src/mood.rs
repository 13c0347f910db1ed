//! Mood and time-of-day to recommendation seed mapping.

/// Seed parameters for the recommendations endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Seeds {
    pub genres: &'static [&'static str],
    pub target_valence: f32,
    pub target_energy: f32,
}

pub fn seeds_for(mood: &str, time_of_day: &str) -> Seeds {
    let (genres, valence, energy): (&'static [&'static str], f32, f32) =
        match mood.trim().to_ascii_lowercase().as_str() {
            "happy" => (&["pop", "dance", "happy"], 0.85, 0.75),
            "energetic" => (&["edm", "work-out", "rock"], 0.7, 0.9),
            "sad" => (&["sad", "acoustic", "piano"], 0.2, 0.3),
            "calm" | "relaxed" => (&["chill", "ambient", "acoustic"], 0.5, 0.25),
            "romantic" => (&["romance", "r-n-b", "soul"], 0.65, 0.4),
            "focused" => (&["study", "classical", "ambient"], 0.4, 0.35),
            "angry" => (&["metal", "hard-rock", "punk"], 0.3, 0.95),
            _ => (&["indie", "pop", "chill"], 0.5, 0.5),
        };

    let energy_shift = match time_of_day.trim().to_ascii_lowercase().as_str() {
        "morning" => 0.05,
        "evening" => -0.05,
        "night" => -0.15,
        _ => 0.0,
    };

    Seeds {
        genres,
        target_valence: valence,
        target_energy: (energy + energy_shift).clamp(0.0, 1.0),
    }
}
