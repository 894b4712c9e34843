use std::collections::HashMap;

pub fn builtin_creatures() -> &'static str {
    include_str!("../content/creatures.yaml")
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        (
            "snake_pit",
            include_str!("../content/encounters/snake_pit.yaml"),
        ),
        (
            "roper_lair",
            include_str!("../content/encounters/roper_lair.yaml"),
        ),
    ])
}
