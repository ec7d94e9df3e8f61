use ark_std::{
    end_timer,
    rand::{rngs::StdRng, SeedableRng},
    start_timer,
};
use clap::Parser;
use predicate_encryption::{
    attributes::{attribute_set, AttributeSet, CiphertextIndex, KeyIndex},
    distributed::{combine, combine_key_material, partial_decaps, split_decryption_key, DistributionConfig},
    encryption::PlainText,
    hybrid,
    kem::{Blake2bKdf, PredicateKem, SymmetricKeyPredicateKem},
    repr::Representable,
    scheme::PredicateScheme,
    setup::{SchemeId, SetupConfig},
    PredEncError,
};
use std::process;
use tracing::info;

type E = ark_bls12_381::Bls12_381;
type Fr = <E as ark_ec::pairing::Pairing>::ScalarField;

#[derive(Parser, Debug)]
#[command(about = "Fuzzy identity-based encryption demo", author, version)]
struct Cli {
    /// Maximum number of attributes per key or ciphertext
    #[arg(long = "universe", default_value_t = 6)]
    universe: usize,

    /// Attributes a key and ciphertext must share
    #[arg(long = "threshold", default_value_t = 3)]
    threshold: usize,

    /// Number of key servers in the distributed phase
    #[arg(long = "servers", default_value_t = 5)]
    servers: usize,

    /// Key shares needed to decrypt in the distributed phase
    #[arg(long = "share-threshold", default_value_t = 3)]
    share_threshold: usize,

    /// Comma-separated ciphertext attributes
    #[arg(long = "ciphertext-attributes", default_value = "A,B,C,D")]
    ciphertext_attributes: String,

    /// Comma-separated key attributes
    #[arg(long = "key-attributes", default_value = "A,B,C,E")]
    key_attributes: String,

    /// Payload for the hybrid encryption phase
    #[arg(long = "message", default_value = "attack at dawn")]
    message: String,
}

/// Prints an error message and exits the program with an error code.
fn handle_error(message: &str, error: impl std::fmt::Debug) -> ! {
    eprintln!("✗ ERROR: {}", message);
    eprintln!("  Details: {:?}", error);
    process::exit(1);
}

/// StdRng seeded from OS entropy.
fn secure_rng() -> StdRng {
    let mut seed = [0u8; 32];
    if let Err(e) = getrandom::fill(&mut seed) {
        handle_error("Failed to gather OS entropy", e);
    }
    StdRng::from_seed(seed)
}

fn parse_attributes(list: &str) -> AttributeSet<Fr> {
    let labels: Vec<&str> = list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    attribute_set(&labels)
}

fn phase(title: &str) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║   Predicate Encryption - Client Demo                       ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let config = SetupConfig::new(cli.universe, cli.threshold);
    let distribution = DistributionConfig::new(cli.servers, cli.share_threshold);
    if let Err(e) = distribution.validate() {
        handle_error("Invalid distribution parameters", e);
    }

    println!("Configuration:");
    println!("  Attribute universe (n): {}", config.universe_size);
    println!("  Overlap threshold (d): {}", config.threshold);
    println!("  Key servers: {} (any {} decrypt)", distribution.servers, distribution.threshold);
    println!();

    let mut rng = secure_rng();

    phase("Phase 1: Setup");
    let setup_timer = start_timer!(|| "Generating public parameters");
    let (pe, msk) = match PredicateScheme::<E>::setup(SchemeId::Fuzzy, &config, &mut rng) {
        Ok(result) => result,
        Err(e) => handle_error("Failed to run setup", e),
    };
    end_timer!(setup_timer);
    match pe.public_parameters().to_bytes() {
        Ok(bytes) => println!("✓ Public parameters generated ({} bytes)", bytes.len()),
        Err(e) => handle_error("Failed to serialize public parameters", e),
    }
    println!();

    phase("Phase 2: Key Generation");
    let key_attributes = parse_attributes(&cli.key_attributes);
    let ct_attributes = parse_attributes(&cli.ciphertext_attributes);
    let key_timer = start_timer!(|| "Issuing decryption key");
    let dk = match pe.generate_decryption_key(&msk, &KeyIndex::Attributes(key_attributes.clone()), &mut rng) {
        Ok(key) => key,
        Err(e) => handle_error("Failed to issue decryption key", e),
    };
    end_timer!(key_timer);
    println!("✓ Decryption key issued for {} attributes", key_attributes.len());
    println!(
        "  Overlap with ciphertext attributes: {}",
        key_attributes.intersection(&ct_attributes).count()
    );
    println!();

    phase("Phase 3: Encryption");
    let ek = match pe.generate_encryption_key(&CiphertextIndex::Attributes(ct_attributes)) {
        Ok(key) => key,
        Err(e) => handle_error("Failed to build encryption key", e),
    };
    let message = PlainText::random(&mut rng);
    let enc_timer = start_timer!(|| "Encrypting");
    let ct = match pe.encrypt(&message, &ek, &mut rng) {
        Ok(ciphertext) => ciphertext,
        Err(e) => handle_error("Failed to encrypt", e),
    };
    end_timer!(enc_timer);
    match ct.to_bytes() {
        Ok(bytes) => println!("✓ Ciphertext generated ({} bytes)", bytes.len()),
        Err(e) => handle_error("Failed to serialize ciphertext", e),
    }
    println!();

    phase("Phase 4: Decryption");
    let dec_timer = start_timer!(|| "Decrypting");
    let decrypted = pe.decrypt(&ct, &dk);
    end_timer!(dec_timer);
    match decrypted {
        Ok(m) if m == message => println!("✓ SUCCESS: Decrypted plaintext matches!"),
        Ok(_) => {
            println!("✗ ERROR: Decrypted plaintext does not match!");
            process::exit(1);
        }
        Err(PredEncError::UnqualifiedKey(reason)) => {
            println!("✓ Key rejected as expected: {}", reason);
            println!("  Stopping here; the remaining phases need a qualified key.");
            return;
        }
        Err(e) => handle_error("Failed to decrypt", e),
    }

    let kem = SymmetricKeyPredicateKem::new(pe.clone(), Blake2bKdf::default());
    let sealed = match hybrid::encrypt::<E, _, _>(&kem, &ek, cli.message.as_bytes(), &mut rng) {
        Ok(sealed) => sealed,
        Err(e) => handle_error("Failed to seal payload", e),
    };
    match hybrid::decrypt(&kem, &sealed, &dk) {
        Ok(opened) if opened == cli.message.as_bytes() => {
            println!("✓ Hybrid payload recovered: {:?}", cli.message)
        }
        Ok(_) => {
            println!("✗ ERROR: Hybrid payload does not match!");
            process::exit(1);
        }
        Err(e) => handle_error("Failed to open payload", e),
    }
    println!();

    phase("Phase 5: Distributed Key Shares");
    let split_timer = start_timer!(|| "Splitting decryption key");
    let shares = match split_decryption_key(&dk, &distribution, &mut rng) {
        Ok(shares) => shares,
        Err(e) => handle_error("Failed to split decryption key", e),
    };
    end_timer!(split_timer);
    println!("✓ Issued {} key shares", shares.len());

    let t = distribution.threshold;
    let first = &shares[..t];
    let last = &shares[shares.len() - t..];
    for (label, subset) in [("first", first), ("last", last)] {
        match combine(subset) {
            Ok(key) if key == dk => println!("✓ Combining the {} {} shares rebuilds the key", label, t),
            Ok(_) => {
                println!("✗ ERROR: Combined key from the {} {} shares differs!", label, t);
                process::exit(1);
            }
            Err(e) => handle_error("Failed to combine key shares", e),
        }
    }

    let (material, encapsulated) = match pe.encaps(&ek, &mut rng) {
        Ok(result) => result,
        Err(e) => handle_error("Failed to encapsulate", e),
    };
    let partials = match last
        .iter()
        .map(|share| partial_decaps(&pe, &encapsulated, share))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(partials) => partials,
        Err(e) => handle_error("Failed to decapsulate with key shares", e),
    };
    match combine_key_material(&partials) {
        Ok(combined) if combined == material => {
            println!("✓ Servers jointly recovered key material {}", combined.to_hex());
            info!(servers = partials.len(), "distributed decapsulation verified");
        }
        Ok(_) => {
            println!("✗ ERROR: Combined key material differs!");
            process::exit(1);
        }
        Err(e) => handle_error("Failed to combine key material", e),
    }

    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║   Demo completed successfully!                             ║");
    println!("╚════════════════════════════════════════════════════════════╝");
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .try_init();
    });
}
