// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// A source of random data used for probabilistic early drops.
///
/// The source is injected into the controller rather than being shared global
/// state, so that every queue owns an independent stream and tests can supply
/// a deterministic one.
pub trait Generator: 'static + Send {
    /// Fills `dest` with unpredictable bits
    fn random_fill(&mut self, dest: &mut [u8]);

    /// Re-seeds the generator so it produces the stream identified by `stream`
    fn set_stream(&mut self, stream: u64);
}

const UNIT_BITS: u32 = f64::MANTISSA_DIGITS;

/// Generates an `f64` uniformly distributed over `[0, 1)`
///
/// Only the upper 53 bits of a random `u64` are used, which is the precision of
/// the `f64` mantissa; every value is representable and `1.0` is never returned.
#[inline]
pub fn gen_unit<R: Generator + ?Sized>(random_generator: &mut R) -> f64 {
    let mut dest = [0; core::mem::size_of::<u64>()];
    random_generator.random_fill(&mut dest);
    let bits = u64::from_le_bytes(dest) >> (u64::BITS - UNIT_BITS);
    bits as f64 / (1u64 << UNIT_BITS) as f64
}

#[cfg(feature = "rand")]
mod small {
    use rand::{rngs::SmallRng, RngCore, SeedableRng};

    /// A fast, seedable, non-cryptographic generator
    #[derive(Clone, Debug)]
    pub struct Seeded(SmallRng);

    impl Seeded {
        pub fn new(stream: u64) -> Self {
            Self(SmallRng::seed_from_u64(stream))
        }
    }

    impl Default for Seeded {
        fn default() -> Self {
            Self::new(0)
        }
    }

    impl super::Generator for Seeded {
        #[inline]
        fn random_fill(&mut self, dest: &mut [u8]) {
            self.0.fill_bytes(dest);
        }

        #[inline]
        fn set_stream(&mut self, stream: u64) {
            self.0 = SmallRng::seed_from_u64(stream);
        }
    }
}

#[cfg(feature = "rand")]
pub use small::Seeded;

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use crate::random;

    #[derive(Debug, Default)]
    pub struct Generator(pub u8);

    impl random::Generator for Generator {
        fn random_fill(&mut self, dest: &mut [u8]) {
            let seed = self.0;

            for (i, elem) in dest.iter_mut().enumerate() {
                *elem = seed ^ i as u8;
            }

            self.0 = self.0.wrapping_add(1)
        }

        fn set_stream(&mut self, stream: u64) {
            self.0 = stream as u8;
        }
    }

    /// A generator that always produces the same unit value from [`random::gen_unit`]
    #[derive(Clone, Copy, Debug)]
    pub struct Fixed(pub f64);

    impl random::Generator for Fixed {
        fn random_fill(&mut self, dest: &mut [u8]) {
            let value = self.0.clamp(0.0, 1.0);
            let bits = (value * (1u64 << super::UNIT_BITS) as f64) as u64;
            let bits = bits.min((1u64 << super::UNIT_BITS) - 1) << (u64::BITS - super::UNIT_BITS);
            let bytes = bits.to_le_bytes();

            for (elem, byte) in dest.iter_mut().zip(bytes.iter().cycle()) {
                *elem = *byte;
            }
        }

        fn set_stream(&mut self, _stream: u64) {}
    }
}
