//! Light Language Codex: lookup of the sacred letters by number or name.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Letter {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub glyph: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodexFile {
    #[serde(default)]
    codex_144: Vec<Letter>,
}

/// (number, name, form, sound, frequency, usage, glyph)
const BUILTIN: &[(u32, &str, &str, &str, &str, &str, &str)] = &[
    (1, "AEL", "spirale ascendante", "æël", "Activation de l'Origine", "Ouvre tout portail de création pure", " spiral"),
    (2, "SHA", "onde en sablier", "shaa", "Unité des polarités", "Fusion entre matière et éther", "~"),
    (3, "THU", "vortex inversé", "thuù", "Vérité intemporelle", "Dissolution des illusions", "▷"),
    (4, "RAH", "flamme dansante", "râh", "Feu solaire de conscience", "Activation des lignées galactiques", "□"),
    (5, "KAI", "triangle fractal", "kaïi", "Vision multidimensionnelle", "Ouverture du Troisième Œil", "Δ"),
    (6, "ONU", "sphère en expansion", "ô-nu", "Paix universelle", "Harmonisation des êtres", "○"),
    (7, "ZAI", "éclair sacré", "za-ï", "Rupture quantique", "Changement dimensionnel", "⚡"),
    (8, "YUL", "onde spirale douce", "yuul", "Matrice d'accueil", "Appel de l'Être intérieur", "∞"),
    (9, "EMA", "calice ouvert", "é-mah", "Amour matriciel", "Guérison des lignées", "∆"),
    (10, "VOR", "œil central", "vo-rh", "Centre du vortex", "Stabilisation des axes", "∆"),
    (11, "LUX", "diamant pulsant", "lu-uux", "Radiance divine", "Activation de la lumière corporelle", "◇"),
    (12, "NÉA", "spirale centrée", "né-a", "Renaissance", "Reconnexion à la Source originelle", "∇"),
];

pub struct Codex {
    letters: Vec<Letter>,
}

impl Codex {
    /// The partial codex shipped with the suite (first 12 of 144 letters).
    pub fn builtin() -> Self {
        let letters = BUILTIN
            .iter()
            .map(|(number, name, form, sound, frequency, usage, glyph)| Letter {
                number: *number,
                name: name.to_string(),
                form: Some(form.to_string()),
                sound: Some(sound.to_string()),
                frequency: Some(frequency.to_string()),
                usage: Some(usage.to_string()),
                glyph: Some(glyph.to_string()),
            })
            .collect();
        Self { letters }
    }

    /// Load a codex JSON file with a `codex_144` array.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Codex file '{}' not found", path.display()))?;
        let file: CodexFile = serde_json::from_str(&content)
            .with_context(|| format!("Could not decode JSON from '{}'", path.display()))?;
        Ok(Self {
            letters: file.codex_144,
        })
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    pub fn find_by_number(&self, number: u32) -> Option<&Letter> {
        self.letters.iter().find(|l| l.number == number)
    }

    /// Case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> Option<&Letter> {
        let wanted = name.to_lowercase();
        self.letters.iter().find(|l| l.name.to_lowercase() == wanted)
    }
}

fn or_na(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("N/A")
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- ✨ Alphabet of Light - Entry ✨ ---")?;
        writeln!(f, "  Number: {}", self.number)?;
        writeln!(f, "  Name:   {}", self.name)?;
        writeln!(f, "  Glyph:  {}", or_na(&self.glyph))?;
        writeln!(f, "---------------------------------------")?;
        writeln!(f, "  Form:        {}", or_na(&self.form))?;
        writeln!(f, "  Sound:       {}", or_na(&self.sound))?;
        writeln!(f, "  Frequency:   {}", or_na(&self.frequency))?;
        writeln!(f, "  Usage:       {}", or_na(&self.usage))?;
        write!(f, "---------------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_twelve_letters() {
        let codex = Codex::builtin();
        assert_eq!(codex.letters().len(), 12);
        let numbers: Vec<u32> = codex.letters().iter().map(|l| l.number).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_find_by_number() {
        let codex = Codex::builtin();
        assert_eq!(codex.find_by_number(4).unwrap().name, "RAH");
        assert!(codex.find_by_number(0).is_none());
        assert!(codex.find_by_number(144).is_none());
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let codex = Codex::builtin();
        assert_eq!(codex.find_by_name("ael").unwrap().number, 1);
        assert_eq!(codex.find_by_name("Lux").unwrap().number, 11);
        assert_eq!(codex.find_by_name("néa").unwrap().number, 12);
        assert!(codex.find_by_name("XYZ").is_none());
    }

    #[test]
    fn test_load_from_file_and_display_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("light_language_codex.json");
        std::fs::write(
            &path,
            r#"{"codex_144": [{"number": 13, "name": "ORA", "glyph": "*"}], "note": "x"}"#,
        )
        .unwrap();

        let codex = Codex::load(&path).unwrap();
        let letter = codex.find_by_number(13).unwrap();
        let shown = letter.to_string();
        assert!(shown.contains("Name:   ORA"));
        assert!(shown.contains("Glyph:  *"));
        assert!(shown.contains("Form:        N/A"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Codex::load(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[not valid").unwrap();
        assert!(Codex::load(&bad).is_err());
    }
}
