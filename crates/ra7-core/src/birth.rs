//! Node birth ritual: BirthHash, neighbour verification, Morse hardware signal.

use sha3::{Digest, Sha3_256};
use std::time::Duration;
use tracing::{info, warn};

use crate::types::{BirthCertificate, Node};

/// Letters flashed on the indicator LED at birth.
pub const BIRTH_SIGNAL: &str = "RA7";

/// International Morse code, letters and digits.
const MORSE: &[(char, &str)] = &[
    ('A', ".-"), ('B', "-..."), ('C', "-.-."), ('D', "-.."), ('E', "."),
    ('F', "..-."), ('G', "--."), ('H', "...."), ('I', ".."), ('J', ".---"),
    ('K', "-.-"), ('L', ".-.."), ('M', "--"), ('N', "-."), ('O', "---"),
    ('P', ".--."), ('Q', "--.-"), ('R', ".-."), ('S', "..."), ('T', "-"),
    ('U', "..-"), ('V', "...-"), ('W', ".--"), ('X', "-..-"), ('Y', "-.--"),
    ('Z', "--.."), ('0', "-----"), ('1', ".----"), ('2', "..---"), ('3', "...--"),
    ('4', "....-"), ('5', "....."), ('6', "-...."), ('7', "--..."), ('8', "---.."),
    ('9', "----."),
];

/// SHA3-256 of `"{gps}:{consent}"`, hex encoded.
pub fn generate_birth_hash(gps_hash: &str, consent_cid: &str) -> String {
    let digest = Sha3_256::digest(format!("{}:{}", gps_hash, consent_cid).as_bytes());
    hex::encode(digest)
}

pub fn morse_for(c: char) -> Option<&'static str> {
    let upper = c.to_ascii_uppercase();
    MORSE.iter().find(|(k, _)| *k == upper).map(|(_, m)| *m)
}

/// Encode `message`, letters separated by three spaces. Unknown chars are skipped.
pub fn encode_morse(message: &str) -> String {
    message
        .chars()
        .filter_map(morse_for)
        .collect::<Vec<_>>()
        .join("   ")
}

/// Placeholder neighbourhood until peer discovery exists.
pub fn nearest_nodes() -> Vec<Node> {
    vec![
        Node {
            id: 101,
            gps_hash: "40.7130,-74.0055".into(),
        },
        Node {
            id: 102,
            gps_hash: "40.7125,-74.0065".into(),
        },
        Node {
            id: 103,
            gps_hash: "40.7132,-74.0068".into(),
        },
    ]
}

pub struct BirthRitual {
    pub gpio_pin: u8,
    pub step_pause: Duration,
}

impl BirthRitual {
    pub fn new(gpio_pin: u8) -> Self {
        Self {
            gpio_pin,
            step_pause: Duration::from_secs(1),
        }
    }

    /// Every neighbour signs; real signatures are not implemented yet.
    async fn verify_with(&self, birth_hash: &str, nodes: &[Node]) -> Vec<u32> {
        info!(
            "Requesting verification of {} from {} nearest nodes...",
            birth_hash,
            nodes.len()
        );
        let mut signed = Vec::with_capacity(nodes.len());
        for node in nodes {
            info!("Node {} at {} is verifying the BirthHash...", node.id, node.gps_hash);
            tokio::time::sleep(self.step_pause / 4).await;
            signed.push(node.id);
        }
        info!("All nearest nodes have signed the BirthHash.");
        signed
    }

    async fn flash(&self, message: &str) {
        info!("Initiating hardware birth sequence on GPIO-{}...", self.gpio_pin);
        for c in message.chars() {
            match morse_for(c) {
                Some(code) => {
                    info!("Flashing '{}': {}", c.to_ascii_uppercase(), code);
                    tokio::time::sleep(self.step_pause).await;
                }
                None => warn!("No Morse code for {:?}, skipped", c),
            }
        }
        info!("Hardware birth sequence complete.");
    }

    /// Run the full ritual for a node at `gps` with consent document `consent`.
    pub async fn execute(&self, gps: &str, consent: &str, nodes: &[Node]) -> BirthCertificate {
        info!("--- Initiating Node Birth Ritual ---");

        info!("Step 1: Generating BirthHash...");
        let birth_hash = generate_birth_hash(gps, consent);
        info!("Generated BirthHash: {}", birth_hash);

        info!("Step 2: Verification...");
        let verified_by = self.verify_with(&birth_hash, nodes).await;

        info!("Step 3: Hardware Birth...");
        self.flash(BIRTH_SIGNAL).await;

        info!("--- Node Birth Ritual Complete. Welcome to the network. ---");
        BirthCertificate {
            birth_hash,
            verified_by,
            morse: encode_morse(BIRTH_SIGNAL),
        }
    }
}
