//! Encoder throughput benchmarks.
//!
//! Sweeps a (file size x packet count) matrix and reports encode throughput
//! for the Solinas-prime kernels next to a byte-oriented GF(256) baseline
//! doing the same matrix-vector product. Run with:
//!
//! ```text
//! cargo run --release --example benchmark
//! ```

use std::time::Instant;

use gf256::gf256;
use solinas64::{encode, hash_to_nonzero_fp, hash_u64, Random, RegionReader};

const FILE_SIZES: [usize; 5] = [10, 100, 1000, 10_000, 100_000];
const PACKET_COUNTS: [usize; 9] = [2, 4, 8, 16, 32, 64, 128, 256, 512];
const TRIALS: usize = 100;

fn gf256_mul_mem(dst: &mut [u8], src: &[u8], coeff: u8) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = u8::from(gf256(s) * gf256(coeff));
    }
}

fn gf256_muladd_mem(dst: &mut [u8], src: &[u8], coeff: u8) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d ^= u8::from(gf256(s) * gf256(coeff));
    }
}

/// Same linear combination as `encode`, over GF(256) bytes instead of
/// Solinas-prime words. Comparison baseline only.
fn encode_gf256(originals: &[Vec<u8>], bytes: usize, seed: u64, recovery: &mut [u8]) {
    let row_seed = hash_u64(seed);

    let mut coeff = hash_to_nonzero_fp(row_seed) as u8;
    if coeff == 0 {
        coeff = 1;
    }
    gf256_mul_mem(&mut recovery[..bytes], &originals[0][..bytes], coeff);

    for (i, original) in originals.iter().enumerate().skip(1) {
        let mut coeff = hash_to_nonzero_fp(row_seed.wrapping_add(i as u64)) as u8;
        if coeff == 0 {
            coeff = 1;
        }
        gf256_muladd_mem(&mut recovery[..bytes], &original[..bytes], coeff);
    }
}

fn fill_random(prng: &mut Random, data: &mut [u8]) {
    for chunk in data.chunks_mut(8) {
        // A few all-ones words keep the escape path honest.
        let w = if prng.next() % 100 <= 3 {
            u64::MAX
        } else {
            prng.next()
        };
        for (dst, src) in chunk.iter_mut().zip(w.to_le_bytes()) {
            *dst = src;
        }
    }
}

fn main() {
    println!("Solinas64 erasure-code encoder benchmarks.");
    println!("Throughput is original data bytes processed per microsecond (MB/s).");
    println!();

    let mut prng = Random::new(0);

    for &file_size in &FILE_SIZES {
        println!("Testing file size = {file_size} bytes");

        let workspace_bytes = RegionReader::workspace_bytes(file_size);
        let max_recovery_bytes = RegionReader::max_output_bytes(file_size);

        for &n in &PACKET_COUNTS {
            let mut originals: Vec<Vec<u8>> = vec![vec![0u8; file_size]; n];
            let mut workspace = vec![0u8; workspace_bytes];
            let mut recovery = vec![0u8; max_recovery_bytes];

            let mut size_sum: u64 = 0;
            let mut solinas_usec: u128 = 0;
            let mut gf256_usec: u128 = 0;

            for trial in 0..TRIALS {
                for original in originals.iter_mut() {
                    fill_random(&mut prng, original);
                }
                let refs: Vec<&[u8]> = originals.iter().map(|p| p.as_slice()).collect();

                let t0 = Instant::now();
                let written = encode(&refs, trial as u64, &mut workspace, &mut recovery)
                    .expect("sized buffers");
                solinas_usec += t0.elapsed().as_micros();
                size_sum += written as u64;

                let t0 = Instant::now();
                encode_gf256(&originals, file_size, trial as u64, &mut recovery);
                gf256_usec += t0.elapsed().as_micros();
            }

            let total_bytes = (file_size * n * TRIALS) as u128;
            print!("N = {n} : ");
            print!("gf256_MBPS={} ", total_bytes / gf256_usec.max(1));
            print!("Solinas64_MBPS={} ", total_bytes / solinas_usec.max(1));
            println!(
                "Solinas64_OutputBytes={:.1}",
                size_sum as f64 / TRIALS as f64
            );
        }
        println!();
    }
}
