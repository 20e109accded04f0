use serde::{Deserialize, Serialize};
use tigerbeetle as tb;

/// A ledger account as handled by the CLI.
///
/// Balances are owned by the cluster; the CLI only carries them between the
/// client and the terminal or a JSON file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(with = "narrow")]
    pub id: u128,

    /// Stored in the cluster as `user_data_128`.
    #[serde(with = "narrow", default)]
    pub user_id: u128,

    pub ledger: u32,
    pub code: u16,

    #[serde(default)]
    pub flags: u16,

    #[serde(with = "narrow", default)]
    pub debits_pending: u128,
    #[serde(with = "narrow", default)]
    pub debits_posted: u128,
    #[serde(with = "narrow", default)]
    pub credits_pending: u128,
    #[serde(with = "narrow", default)]
    pub credits_posted: u128,
}

impl Account {
    /// A fresh account with zero balances, ready to be created.
    pub fn new(id: u128, ledger: u32, code: u16, flags: u16) -> Self {
        Self {
            id,
            ledger,
            code,
            flags,
            ..Default::default()
        }
    }
}

impl From<&Account> for tb::Account {
    fn from(account: &Account) -> Self {
        tb::Account {
            id: account.id,
            user_data_128: account.user_id,
            ledger: account.ledger,
            code: account.code,
            flags: tb::AccountFlags(account.flags),
            debits_pending: account.debits_pending,
            debits_posted: account.debits_posted,
            credits_pending: account.credits_pending,
            credits_posted: account.credits_posted,
            ..Default::default()
        }
    }
}

impl From<tb::Account> for Account {
    fn from(account: tb::Account) -> Self {
        Self {
            id: account.id,
            user_id: account.user_data_128,
            ledger: account.ledger,
            code: account.code,
            flags: account.flags.0,
            debits_pending: account.debits_pending,
            debits_posted: account.debits_posted,
            credits_pending: account.credits_pending,
            credits_posted: account.credits_posted,
        }
    }
}

/// A movement of `amount` from the debit account to the credit account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(with = "narrow")]
    pub id: u128,
    #[serde(with = "narrow")]
    pub debit_account_id: u128,
    #[serde(with = "narrow")]
    pub credit_account_id: u128,
    #[serde(with = "narrow")]
    pub amount: u128,

    /// Links a post or void to the pending transfer it settles.
    #[serde(with = "narrow", default)]
    pub pending_id: u128,

    #[serde(with = "narrow", default)]
    pub user_data_128: u128,
    #[serde(default)]
    pub user_data_64: u64,
    #[serde(default)]
    pub user_data_32: u32,

    /// Seconds before a pending transfer expires.
    #[serde(default)]
    pub timeout: u32,

    pub ledger: u32,
    pub code: u16,

    #[serde(default)]
    pub flags: u16,

    /// Assigned by the cluster; zero on submission.
    #[serde(default)]
    pub timestamp: u64,
}

impl Transfer {
    pub fn new(
        id: u128,
        debit_account_id: u128,
        credit_account_id: u128,
        amount: u128,
        ledger: u32,
        code: u16,
        flags: u16,
    ) -> Self {
        Self {
            id,
            debit_account_id,
            credit_account_id,
            amount,
            ledger,
            code,
            flags,
            ..Default::default()
        }
    }
}

impl From<&Transfer> for tb::Transfer {
    fn from(transfer: &Transfer) -> Self {
        tb::Transfer {
            id: transfer.id,
            debit_account_id: transfer.debit_account_id,
            credit_account_id: transfer.credit_account_id,
            amount: transfer.amount,
            pending_id: transfer.pending_id,
            user_data_128: transfer.user_data_128,
            user_data_64: transfer.user_data_64,
            user_data_32: transfer.user_data_32,
            timeout: transfer.timeout,
            ledger: transfer.ledger,
            code: transfer.code,
            flags: tb::TransferFlags(transfer.flags),
            timestamp: transfer.timestamp,
            ..Default::default()
        }
    }
}

impl From<tb::Transfer> for Transfer {
    fn from(transfer: tb::Transfer) -> Self {
        Self {
            id: transfer.id,
            debit_account_id: transfer.debit_account_id,
            credit_account_id: transfer.credit_account_id,
            amount: transfer.amount,
            pending_id: transfer.pending_id,
            user_data_128: transfer.user_data_128,
            user_data_64: transfer.user_data_64,
            user_data_32: transfer.user_data_32,
            timeout: transfer.timeout,
            ledger: transfer.ledger,
            code: transfer.code,
            flags: transfer.flags.0,
            timestamp: transfer.timestamp,
        }
    }
}

/// JSON files carry 128-bit fields as plain 64-bit integers so they stay
/// readable and editable by hand. Values that do not fit are rejected rather
/// than truncated.
mod narrow {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let narrowed = u64::try_from(*value).map_err(|_| {
            <S::Error as ser::Error>::custom(format!("value {} does not fit in 64 bits", value))
        })?;
        serializer.serialize_u64(narrowed)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer)
            .map(u128::from)
            .map_err(|err| de::Error::custom(format!("expected a 64-bit unsigned integer: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_encode_account_with_snake_case_fields() {
        let account = Account::new(1000, 700, 10, 0);
        let value = serde_json::to_value(&account).unwrap();

        assert_eq!(value["id"], 1000);
        assert_eq!(value["user_id"], 0);
        assert_eq!(value["ledger"], 700);
        assert_eq!(value["code"], 10);
        assert_eq!(value["debits_pending"], 0);
        assert_eq!(value["credits_posted"], 0);
    }

    #[test]
    fn should_fill_missing_account_balances_with_zero() {
        let account: Account =
            serde_json::from_str(r#"{"id": 7, "ledger": 1, "code": 2}"#).unwrap();
        assert_eq!(account, Account::new(7, 1, 2, 0));
    }

    #[test]
    fn should_refuse_to_encode_ids_wider_than_64_bits() {
        let account = Account::new(u128::from(u64::MAX) + 1, 1, 1, 0);
        let err = serde_json::to_string(&account).unwrap_err();
        assert!(err.to_string().contains("does not fit in 64 bits"));
    }

    #[test]
    fn should_keep_largest_64_bit_value_through_json() {
        let mut transfer = Transfer::new(u128::from(u64::MAX), 1, 2, 3, 700, 10, 0);
        transfer.pending_id = 99;
        transfer.timeout = 30;

        let encoded = serde_json::to_string(&transfer).unwrap();
        let decoded: Transfer = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, transfer);
    }

    #[test]
    fn should_reject_negative_amounts_in_files() {
        let result: Result<Transfer, _> = serde_json::from_str(
            r#"{"id": 1, "debit_account_id": 1, "credit_account_id": 2, "amount": -5, "ledger": 1, "code": 1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn should_carry_full_width_values_to_the_client_types() {
        let mut account = Account::new(u128::MAX, 700, 10, 0b101);
        account.user_id = u128::MAX - 1;

        let wire = tb::Account::from(&account);
        assert_eq!(wire.id, u128::MAX);
        assert_eq!(wire.user_data_128, u128::MAX - 1);
        assert_eq!(wire.flags.0, 0b101);
        assert_eq!(Account::from(wire), account);

        let transfer = Transfer::new(u128::MAX, 1, 2, u128::MAX, 700, 10, 2);
        let wire = tb::Transfer::from(&transfer);
        assert_eq!(wire.amount, u128::MAX);
        assert_eq!(Transfer::from(wire), transfer);
    }
}
