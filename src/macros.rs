// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for creating transactions.
///
/// The transaction kind is written the way it is displayed:
///
/// ```rust
/// # use txlog::{Transaction, transaction};
/// let add: Transaction<u32, &str> = transaction!(ADD 1, "new");
/// let update: Transaction<u32, &str> = transaction!(UPDATE 1, "changed");
/// let delete: Transaction<u32, &str> = transaction!(DELETE 1);
/// let child: Transaction<u32, &str> = transaction!(ADD 5, "child", parent 2);
///
/// assert_eq!(add, Transaction::add(1, "new"));
/// assert_eq!(child.parent_id, Some(2));
/// ```
///
/// NOTE! Parents can only be given for ADDs, since that is the only kind a hierarchical service
/// accepts them on.
#[macro_export]
macro_rules! transaction {
    (ADD $id:expr, $value:expr, parent $parent:expr) => {
        $crate::Transaction::add($id, $value).with_parent($parent)
    };
    (ADD $id:expr, $value:expr) => {
        $crate::Transaction::add($id, $value)
    };
    (UPDATE $id:expr, $value:expr) => {
        $crate::Transaction::update($id, $value)
    };
    (DELETE $id:expr) => {
        $crate::Transaction::delete($id)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Transaction, TransactionType};

    #[test]
    fn transaction_macro() {
        let txs: [Transaction<u32, &str>; 4] = [
            transaction!(ADD 1, "a"),
            transaction!(UPDATE 1, "b"),
            transaction!(DELETE 1),
            transaction!(ADD 5, "c", parent 2),
        ];
        let shown = txs.iter().map(ToString::to_string).collect::<Vec<_>>();
        insta::assert_snapshot!(shown.join("\n"), @r"
        ADD 1
        UPDATE 1
        DELETE 1
        ADD 5 (parent 2)
        ");
        assert_eq!(txs[1].new_value, Some("b"));
        assert_eq!(txs[2].new_value, None);
        assert_eq!(txs[3].kind, TransactionType::Add);
    }

    #[cfg(feature = "json")]
    #[test]
    fn transaction_macro_accepts_json_payloads() {
        use serde_json::json;

        let tx: Transaction<u32, serde_json::Value> =
            transaction!(UPDATE 7, json!({ "name": "B" }));
        assert_eq!(tx, Transaction::update(7, json!({ "name": "B" })));
    }
}
