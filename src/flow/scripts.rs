//! Chain-defined scripts and event names the pool depends on.

/// Creates an account paid for by the signer and adds one key to it.
///
/// Takes the hex registration encoding of the key as its only argument.
pub const CREATE_ACCOUNT_SCRIPT: &str = r#"
transaction(publicKey: String) {
    let payer: AuthAccount

    prepare(payer: AuthAccount) {
        self.payer = payer
    }

    execute {
        let account = AuthAccount(payer: self.payer)

        account.addPublicKey(publicKey.decodeHex())
    }
}
"#;

/// Emitted once per account created.
pub const ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";

/// Field of `ACCOUNT_CREATED_EVENT` holding the new address.
pub const ACCOUNT_CREATED_ADDRESS_FIELD: &str = "address";
