//! Packed layouts of the token program's accounts.

use solana_sdk::pubkey::Pubkey;

use crate::DecodeError;

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], expected: usize) -> Result<Self, DecodeError> {
        if data.len() < expected {
            return Err(DecodeError::TooShort {
                expected,
                found: data.len(),
            });
        }

        Ok(Self { data, offset: 0 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    fn pubkey(&mut self) -> Pubkey {
        Pubkey::new_from_array(self.take())
    }

    fn bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.u8() {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(DecodeError::Malformed(format!("invalid bool {x} in {field}"))),
        }
    }

    fn tag(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.u32() {
            0 => Ok(false),
            1 => Ok(true),
            x => Err(DecodeError::InvalidOptionTag(field, x)),
        }
    }

    fn option_pubkey(&mut self, field: &'static str) -> Result<Option<Pubkey>, DecodeError> {
        let present = self.tag(field)?;
        let value = self.pubkey();
        Ok(present.then_some(value))
    }

    fn option_u64(&mut self, field: &'static str) -> Result<Option<u64>, DecodeError> {
        let present = self.tag(field)?;
        let value = self.u64();
        Ok(present.then_some(value))
    }
}

fn put_option_pubkey(out: &mut Vec<u8>, value: Option<&Pubkey>) {
    match value {
        Some(key) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(key.as_ref());
        }
        None => {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 32]);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mint {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Pubkey>,
}

impl Mint {
    pub const LEN: usize = 82;

    pub fn unpack(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data, Self::LEN)?;

        Ok(Self {
            mint_authority: reader.option_pubkey("mint_authority")?,
            supply: reader.u64(),
            decimals: reader.u8(),
            is_initialized: reader.bool("is_initialized")?,
            freeze_authority: reader.option_pubkey("freeze_authority")?,
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);

        put_option_pubkey(&mut out, self.mint_authority.as_ref());
        out.extend_from_slice(&self.supply.to_le_bytes());
        out.push(self.decimals);
        out.push(self.is_initialized as u8);
        put_option_pubkey(&mut out, self.freeze_authority.as_ref());

        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenAccountState {
    Uninitialized = 0,
    Initialized = 1,
    Frozen = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub delegate: Option<Pubkey>,
    pub state: TokenAccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    pub close_authority: Option<Pubkey>,
}

impl TokenAccount {
    pub const LEN: usize = 165;

    /// A freshly initialized, empty account holding `mint` tokens for `owner`
    pub fn new(mint: Pubkey, owner: Pubkey) -> Self {
        Self {
            mint,
            owner,
            amount: 0,
            delegate: None,
            state: TokenAccountState::Initialized,
            is_native: None,
            delegated_amount: 0,
            close_authority: None,
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data, Self::LEN)?;

        let mint = reader.pubkey();
        let owner = reader.pubkey();
        let amount = reader.u64();
        let delegate = reader.option_pubkey("delegate")?;

        let state = match reader.u8() {
            0 => TokenAccountState::Uninitialized,
            1 => TokenAccountState::Initialized,
            2 => TokenAccountState::Frozen,
            x => return Err(DecodeError::Malformed(format!("invalid account state {x}"))),
        };

        Ok(Self {
            mint,
            owner,
            amount,
            delegate,
            state,
            is_native: reader.option_u64("is_native")?,
            delegated_amount: reader.u64(),
            close_authority: reader.option_pubkey("close_authority")?,
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);

        out.extend_from_slice(self.mint.as_ref());
        out.extend_from_slice(self.owner.as_ref());
        out.extend_from_slice(&self.amount.to_le_bytes());
        put_option_pubkey(&mut out, self.delegate.as_ref());
        out.push(self.state as u8);

        match self.is_native {
            Some(x) => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&x.to_le_bytes());
            }
            None => out.extend_from_slice(&[0u8; 12]),
        }

        out.extend_from_slice(&self.delegated_amount.to_le_bytes());
        put_option_pubkey(&mut out, self.close_authority.as_ref());

        out
    }
}
