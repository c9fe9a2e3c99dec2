//! The injected hash capability.
//!
//! Containers take a hasher type parameter implementing [`HashFn`] for
//! their key type instead of relying on `std::hash::Hash`. The slot table
//! consumes all 32 bits of the result through its perturbed probe, so a
//! cheap hash that merely depends on every bit of the key (for example an
//! identity cast for integers) is good enough.
//!
//! Lookups through a borrowed form (`Map<String, _>::lookup("k")`) hash the
//! borrowed value, so every implementation here hashes a value and its
//! borrowed forms identically.

/// A hash function from keys of type `K` to 32-bit hashes.
pub trait HashFn<K: ?Sized> {
    /// Hash `key`.
    fn hash(&self, key: &K) -> u32;
}

/// The default hasher used by every Strata container.
///
/// Makes no assumption about the key distribution: integers hash to
/// themselves, floats to their bit pattern, and strings through the
/// classic `h * 33 + byte` polynomial seeded with 5381.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultHash;

/// Seed of the string polynomial hash.
pub const STRING_HASH_SEED: u32 = 5381;

/// Multiplier of the string polynomial hash.
pub const STRING_HASH_MULTIPLIER: u32 = 33;

macro_rules! identity_hash {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HashFn<$ty> for DefaultHash {
                #[inline]
                fn hash(&self, key: &$ty) -> u32 {
                    *key as u32
                }
            }
        )*
    };
}

identity_hash!(i8, u8, i16, u16, i32, u32, i64, u64, isize, usize, bool, char);

impl HashFn<f32> for DefaultHash {
    #[inline]
    fn hash(&self, key: &f32) -> u32 {
        key.to_bits()
    }
}

impl HashFn<f64> for DefaultHash {
    #[inline]
    fn hash(&self, key: &f64) -> u32 {
        let bits = key.to_bits();
        (bits ^ (bits >> 32)) as u32
    }
}

impl HashFn<str> for DefaultHash {
    #[inline]
    fn hash(&self, key: &str) -> u32 {
        key.bytes().fold(STRING_HASH_SEED, |hash, byte| {
            hash.wrapping_mul(STRING_HASH_MULTIPLIER)
                .wrapping_add(u32::from(byte))
        })
    }
}

impl HashFn<String> for DefaultHash {
    #[inline]
    fn hash(&self, key: &String) -> u32 {
        <Self as HashFn<str>>::hash(self, key.as_str())
    }
}

impl<T: ?Sized> HashFn<&T> for DefaultHash
where
    DefaultHash: HashFn<T>,
{
    #[inline]
    fn hash(&self, key: &&T) -> u32 {
        <Self as HashFn<T>>::hash(self, *key)
    }
}

// Allocations are at least 8-byte aligned on 64-bit targets, so the low
// three address bits carry no information.
impl<T: ?Sized> HashFn<*const T> for DefaultHash {
    #[inline]
    fn hash(&self, key: &*const T) -> u32 {
        (key.addr() >> 3) as u32
    }
}

impl<T: ?Sized> HashFn<*mut T> for DefaultHash {
    #[inline]
    fn hash(&self, key: &*mut T) -> u32 {
        (key.addr() >> 3) as u32
    }
}

impl<A, B> HashFn<(A, B)> for DefaultHash
where
    DefaultHash: HashFn<A> + HashFn<B>,
{
    #[inline]
    fn hash(&self, key: &(A, B)) -> u32 {
        let first = <Self as HashFn<A>>::hash(self, &key.0);
        let second = <Self as HashFn<B>>::hash(self, &key.1);
        first ^ second.wrapping_mul(STRING_HASH_MULTIPLIER)
    }
}
