//! Paper fixtures

use conceptgraph::Paper;

pub fn paper(id: &str, text: &str) -> Paper {
    Paper::new(id, "", text)
}

/// Three short abstracts on cryptography and security
pub fn crypto_corpus() -> Vec<Paper> {
    vec![
        Paper::new(
            "crypto-1",
            "Primitives for secure messaging",
            "Cryptographic primitives such as hash functions and digital signatures protect messages. \
             Hash functions compress arbitrary input. Digital signatures bind a message to a key.",
        ),
        Paper::new(
            "crypto-2",
            "Detecting intrusions",
            "Neural networks are used for intrusion detection. Intrusion detection systems monitor networks. \
             The neural networks flag anomalous traffic in real time.",
        ),
        Paper::new(
            "crypto-3",
            "Signatures in practice",
            "Digital signatures authenticate software updates. Hash functions and digital signatures \
             appear in every update protocol. Software updates are signed by the vendor.",
        ),
    ]
}

/// Two papers that each mention "quantum cryptography" exactly once
pub fn quantum_pair() -> Vec<Paper> {
    vec![
        paper(
            "q-1",
            "This paper is about quantum cryptography and its limits. Lattice schemes are an alternative to it.",
        ),
        paper(
            "q-2",
            "Key distribution with quantum cryptography is practical. Satellites have carried the keys.",
        ),
    ]
}
