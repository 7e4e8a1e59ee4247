use alloy::primitives::{keccak256, Address, Bytes, B256, I256, U256};

/// A note commitment: the opaque hash identifying a confidential asset note.
/// Hides the note's value while allowing the registry to attest its validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub B256);

impl Commitment {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl From<B256> for Commitment {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<Commitment> for B256 {
    fn from(value: Commitment) -> Self {
        value.0
    }
}

/// Decode failures for proof-output bytes. All variants are non-retriable:
/// the caller must resubmit corrected input.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MalformedProofOutput {
    #[error("proof output truncated: need {needed} bytes at offset {offset}, have {have}")]
    Truncated {
        offset: usize,
        needed: usize,
        have: usize,
    },

    #[error("declared body length {declared} does not match actual {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("declared count {0} does not fit the remaining payload")]
    CountOverflow(U256),

    #[error("trailing {0} bytes after proof output body")]
    TrailingBytes(usize),

    #[error("empty proof output bundle")]
    EmptyBundle,
}

/// Bounds-checked big-endian reader over a proof-output byte payload.
struct WordReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WordReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], MalformedProofOutput> {
        let end = self
            .offset
            .checked_add(needed)
            .filter(|end| *end <= self.buf.len())
            .ok_or(MalformedProofOutput::Truncated {
                offset: self.offset,
                needed,
                have: self.buf.len().saturating_sub(self.offset),
            })?;
        let slice = &self.buf[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn word(&mut self) -> Result<B256, MalformedProofOutput> {
        Ok(B256::from_slice(self.take(32)?))
    }

    /// Read a 32-byte word and interpret it as an element count,
    /// bounded by what the remaining payload can actually hold.
    fn count(&mut self) -> Result<usize, MalformedProofOutput> {
        let word = U256::from_be_bytes(self.word()?.0);
        let count =
            usize::try_from(word).map_err(|_| MalformedProofOutput::CountOverflow(word))?;
        let max = (self.buf.len() - self.offset) / 32;
        if count > max {
            return Err(MalformedProofOutput::CountOverflow(word));
        }
        Ok(count)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }
}

/// The decoded contents of one accepted asset-transfer proof output.
///
/// Value type: created from registry-returned bytes and consumed within a
/// single settlement call. The commitments are never reversible to plaintext
/// values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedNotes {
    /// Commitments of the notes the proof spends.
    pub input_commitments: Vec<Commitment>,
    /// Commitments of the notes the proof creates.
    pub output_commitments: Vec<Commitment>,
    /// Owner identity attached to the proof output.
    pub owner: Address,
    /// Net public (unshielded) value moved by the transfer.
    pub public_value_delta: I256,
}

/// Wire layout of one proof output, big-endian 32-byte words throughout:
///
/// ```text
/// [0,32)    L, byte length of the body that follows
/// body:
///   [0,32)    n, input commitment count
///   n * 32    input commitments
///   [.,+32)   m, output commitment count
///   m * 32    output commitments
///   [.,+32)   owner address, left-padded to 32 bytes
///   [.,+32)   public value delta, two's-complement
/// ```
///
/// The registry's validity record is keyed on `keccak256(body)`; the length
/// word is excluded. See [`note_section_hash`].
impl ExtractedNotes {
    /// Decode one length-prefixed proof output.
    pub fn decode(proof_output: &[u8]) -> Result<Self, MalformedProofOutput> {
        let mut outer = WordReader::new(proof_output);
        let declared = U256::from_be_bytes(outer.word()?.0);
        let actual = outer.remaining();
        if declared != U256::from(actual) {
            return Err(MalformedProofOutput::LengthMismatch {
                declared: usize::try_from(declared).unwrap_or(usize::MAX),
                actual,
            });
        }
        Self::decode_body(outer.take(actual)?)
    }

    fn decode_body(body: &[u8]) -> Result<Self, MalformedProofOutput> {
        let mut reader = WordReader::new(body);

        let input_count = reader.count()?;
        let mut input_commitments = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            input_commitments.push(Commitment(reader.word()?));
        }

        let output_count = reader.count()?;
        let mut output_commitments = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            output_commitments.push(Commitment(reader.word()?));
        }

        let owner = Address::from_slice(&reader.word()?[12..]);
        let public_value_delta = I256::from_raw(U256::from_be_bytes(reader.word()?.0));

        if reader.remaining() != 0 {
            return Err(MalformedProofOutput::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            input_commitments,
            output_commitments,
            owner,
            public_value_delta,
        })
    }

    /// Encode as a length-prefixed proof output, the exact inverse of
    /// [`ExtractedNotes::decode`].
    pub fn encode(&self) -> Bytes {
        let body_len =
            32 * (self.input_commitments.len() + self.output_commitments.len() + 4);
        let mut out = Vec::with_capacity(32 + body_len);
        out.extend_from_slice(&U256::from(body_len).to_be_bytes::<32>());
        out.extend_from_slice(&U256::from(self.input_commitments.len()).to_be_bytes::<32>());
        for commitment in &self.input_commitments {
            out.extend_from_slice(commitment.as_bytes());
        }
        out.extend_from_slice(&U256::from(self.output_commitments.len()).to_be_bytes::<32>());
        for commitment in &self.output_commitments {
            out.extend_from_slice(commitment.as_bytes());
        }
        out.extend_from_slice(B256::left_padding_from(self.owner.as_slice()).as_slice());
        out.extend_from_slice(&self.public_value_delta.into_raw().to_be_bytes::<32>());
        out.into()
    }
}

/// Hash of a proof output's body with the leading length word stripped:
/// the key under which the registry records the proof's validity.
pub fn note_section_hash(proof_output: &[u8]) -> Result<B256, MalformedProofOutput> {
    let mut reader = WordReader::new(proof_output);
    let declared = U256::from_be_bytes(reader.word()?.0);
    let actual = reader.remaining();
    if declared != U256::from(actual) {
        return Err(MalformedProofOutput::LengthMismatch {
            declared: usize::try_from(declared).unwrap_or(usize::MAX),
            actual,
        });
    }
    Ok(keccak256(reader.take(actual)?))
}

/// Return the first length-prefixed proof output of a bundle.
///
/// Bundle layout: a 32-byte entry count followed by the entries, each being
/// `[length word ‖ body]`. Settlement consumes only the first entry per side.
pub fn first_proof_output(bundle: &[u8]) -> Result<&[u8], MalformedProofOutput> {
    let mut reader = WordReader::new(bundle);
    let count = U256::from_be_bytes(reader.word()?.0);
    if count.is_zero() {
        return Err(MalformedProofOutput::EmptyBundle);
    }
    let start = reader.offset;
    let len_word = U256::from_be_bytes(reader.word()?.0);
    let body_len = usize::try_from(len_word)
        .map_err(|_| MalformedProofOutput::CountOverflow(len_word))?;
    reader.take(body_len)?;
    Ok(&bundle[start..reader.offset])
}

/// Concatenate proof outputs into a bundle with a leading entry count.
pub fn encode_bundle(entries: &[Bytes]) -> Bytes {
    let mut out = Vec::with_capacity(32 + entries.iter().map(|e| e.len()).sum::<usize>());
    out.extend_from_slice(&U256::from(entries.len()).to_be_bytes::<32>());
    for entry in entries {
        out.extend_from_slice(entry);
    }
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn test_notes() -> ExtractedNotes {
        ExtractedNotes {
            input_commitments: vec![Commitment(B256::repeat_byte(0x11))],
            output_commitments: vec![
                Commitment(B256::repeat_byte(0x22)),
                Commitment(B256::repeat_byte(0x33)),
            ],
            owner: address!("00000000000000000000000000000000000000aa"),
            public_value_delta: I256::try_from(-25i64).unwrap(),
        }
    }

    #[test]
    fn roundtrip() {
        let notes = test_notes();
        let encoded = notes.encode();
        let decoded = ExtractedNotes::decode(&encoded).unwrap();
        assert_eq!(decoded, notes);
    }

    #[test]
    fn truncated_payload_rejected() {
        let encoded = test_notes().encode();
        let result = ExtractedNotes::decode(&encoded[..encoded.len() - 1]);
        assert!(matches!(
            result,
            Err(MalformedProofOutput::LengthMismatch { .. })
        ));
    }

    #[test]
    fn truncated_commitment_list_rejected() {
        // Declare 3 input commitments but supply only one word after the count.
        let mut raw = Vec::new();
        raw.extend_from_slice(&U256::from(64u64).to_be_bytes::<32>());
        raw.extend_from_slice(&U256::from(3u64).to_be_bytes::<32>());
        raw.extend_from_slice(B256::repeat_byte(0x11).as_slice());

        let result = ExtractedNotes::decode(&raw);
        assert!(matches!(result, Err(MalformedProofOutput::CountOverflow(_))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let notes = test_notes();
        let mut raw = notes.encode().to_vec();
        // Grow the body by one word and fix up the length prefix so the
        // only violation left is the trailing data itself.
        raw.extend_from_slice(B256::ZERO.as_slice());
        let body_len = raw.len() - 32;
        raw[..32].copy_from_slice(&U256::from(body_len).to_be_bytes::<32>());

        let result = ExtractedNotes::decode(&raw);
        assert!(matches!(result, Err(MalformedProofOutput::TrailingBytes(32))));
    }

    #[test]
    fn section_hash_excludes_length_prefix() {
        let encoded = test_notes().encode();
        let hash = note_section_hash(&encoded).unwrap();
        assert_eq!(hash, keccak256(&encoded[32..]));
    }

    #[test]
    fn negative_public_value_roundtrips() {
        let notes = test_notes();
        let decoded = ExtractedNotes::decode(&notes.encode()).unwrap();
        assert_eq!(decoded.public_value_delta, I256::try_from(-25i64).unwrap());
    }

    #[test]
    fn first_proof_output_of_bundle() {
        let entry_a = test_notes().encode();
        let mut other = test_notes();
        other.input_commitments[0] = Commitment(B256::repeat_byte(0x99));
        let entry_b = other.encode();

        let bundle = encode_bundle(&[entry_a.clone(), entry_b]);
        let first = first_proof_output(&bundle).unwrap();
        assert_eq!(first, entry_a.as_ref());
    }

    #[test]
    fn empty_bundle_rejected() {
        let bundle = encode_bundle(&[]);
        assert_eq!(
            first_proof_output(&bundle),
            Err(MalformedProofOutput::EmptyBundle)
        );
    }
}
