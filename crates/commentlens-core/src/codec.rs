//! Pair-list codec for map- and set-shaped data
//!
//! Maps serialize as an ordered list of `[key, value]` pairs and maps of sets
//! as a list of `[key, [member, ...]]`. Pair order carries no meaning; only
//! membership and values survive a round trip. Use through serde's field
//! attribute:
//!
//! ```ignore
//! #[serde(with = "commentlens_core::codec::pairs")]
//! frequencies: HashMap<String, usize>,
//!
//! #[serde(with = "commentlens_core::codec::pair_sets")]
//! word_documents: HashMap<String, BTreeSet<usize>>,
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

/// A map that can be viewed as key/value pairs and rebuilt from them
pub trait PairMap {
    type Key;
    type Value;

    fn pairs(&self) -> Box<dyn Iterator<Item = (&Self::Key, &Self::Value)> + '_>;
}

impl<K, V, H> PairMap for HashMap<K, V, H>
where
    K: Eq + Hash,
    H: BuildHasher + Default,
{
    type Key = K;
    type Value = V;

    fn pairs(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

impl<K: Ord, V> PairMap for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn pairs(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.iter())
    }
}

/// A set of members that can be listed and rebuilt
pub trait MemberSet {
    type Member;

    fn members(&self) -> Box<dyn Iterator<Item = &Self::Member> + '_>;
}

impl<T, H> MemberSet for HashSet<T, H>
where
    T: Eq + Hash,
    H: BuildHasher + Default,
{
    type Member = T;

    fn members(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }
}

impl<T: Ord> MemberSet for BTreeSet<T> {
    type Member = T;

    fn members(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.iter())
    }
}

/// `key → value` maps as `[[key, value], ...]`. A `null` list reads as empty.
pub mod pairs {
    use super::PairMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<M, S>(map: &M, serializer: S) -> Result<S::Ok, S::Error>
    where
        M: PairMap,
        M::Key: Serialize,
        M::Value: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.pairs())
    }

    pub fn deserialize<'de, M, D>(deserializer: D) -> Result<M, D::Error>
    where
        M: PairMap + FromIterator<(M::Key, M::Value)>,
        M::Key: Deserialize<'de>,
        M::Value: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs = Option::<Vec<(M::Key, M::Value)>>::deserialize(deserializer)?;
        Ok(pairs.unwrap_or_default().into_iter().collect())
    }
}

/// `key → set` maps as `[[key, [member, ...]], ...]`
pub mod pair_sets {
    use super::{MemberSet, PairMap};
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    struct Members<'a, T: MemberSet>(&'a T);

    impl<T> Serialize for Members<'_, T>
    where
        T: MemberSet,
        T::Member: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.0.members())
        }
    }

    pub fn serialize<M, S>(map: &M, serializer: S) -> Result<S::Ok, S::Error>
    where
        M: PairMap,
        M::Key: Serialize,
        M::Value: MemberSet,
        <M::Value as MemberSet>::Member: Serialize,
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(None)?;
        for (key, set) in map.pairs() {
            seq.serialize_element(&(key, Members(set)))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, M, D>(deserializer: D) -> Result<M, D::Error>
    where
        M: PairMap + FromIterator<(M::Key, M::Value)>,
        M::Key: Deserialize<'de>,
        M::Value: MemberSet + FromIterator<<M::Value as MemberSet>::Member>,
        <M::Value as MemberSet>::Member: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        type Entry<K, T> = (K, Option<Vec<T>>);

        let pairs = Option::<Vec<Entry<M::Key, <M::Value as MemberSet>::Member>>>::deserialize(
            deserializer,
        )?;

        Ok(pairs
            .unwrap_or_default()
            .into_iter()
            .map(|(key, members)| (key, members.unwrap_or_default().into_iter().collect()))
            .collect())
    }
}
