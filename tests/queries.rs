//! End-to-end SQL tests: the full pipeline from source text to result
//! sets, including constraint enforcement, three-valued logic, grouping,
//! CTEs, set operations, views and snapshot persistence.

use chrono::NaiveDate;
use terndb::parsing::Parser;
use terndb::{Engine, Error, ExecutionResult, FixedClock, Value};

/// An engine with a fresh `test` database selected.
fn engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .execute_batch("CREATE DATABASE test; USE test;")
        .unwrap();
    engine
}

fn rows(result: ExecutionResult) -> Vec<Vec<Value>> {
    match result {
        ExecutionResult::Select { rows, .. } => rows,
        other => panic!("expected a result set, got {:?}", other),
    }
}

fn query(engine: &mut Engine, sql: &str) -> Vec<Vec<Value>> {
    rows(engine.execute(sql).unwrap())
}

fn count(engine: &mut Engine, sql: &str) -> i64 {
    match query(engine, sql)[0][0] {
        Value::Integer(n) => n,
        ref other => panic!("expected integer, got {:?}", other),
    }
}

#[test]
fn test_constraints_and_defaults() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE t (id SERIAL PRIMARY KEY, name VARCHAR UNIQUE, age INT CHECK (age >= 0))",
        )
        .unwrap();
    engine
        .execute("INSERT INTO t (name, age) VALUES ('a', 10), ('b', 20)")
        .unwrap();

    assert!(matches!(
        engine.execute("INSERT INTO t (name, age) VALUES ('a', 30)"),
        Err(Error::UniqueConstraintViolation(_))
    ));
    assert!(matches!(
        engine.execute("INSERT INTO t (name, age) VALUES ('c', -1)"),
        Err(Error::CheckConstraintViolation(_))
    ));

    assert_eq!(
        query(&mut engine, "SELECT * FROM t"),
        vec![
            vec![Value::Integer(1), Value::string("a"), Value::Integer(10)],
            vec![Value::Integer(2), Value::string("b"), Value::Integer(20)],
        ]
    );
}

#[test]
fn test_check_admits_null() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (age INT CHECK (age >= 0))")
        .unwrap();
    // CHECK admits TRUE and NULL, rejects only FALSE.
    engine.execute("INSERT INTO t VALUES (NULL)").unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM t"), 1);
}

#[test]
fn test_on_conflict_do_update() {
    let mut engine = engine();
    engine
        .execute(
            "CREATE TABLE t (id SERIAL PRIMARY KEY, name VARCHAR UNIQUE, age INT CHECK (age >= 0))",
        )
        .unwrap();
    engine
        .execute("INSERT INTO t (name, age) VALUES ('a', 10), ('b', 20)")
        .unwrap();

    let returned = rows(engine
        .execute(
            "INSERT INTO t (name, age) VALUES ('a', 99) \
             ON CONFLICT (name) DO UPDATE SET age = 99 RETURNING *",
        )
        .unwrap());
    assert_eq!(
        returned,
        vec![vec![
            Value::Integer(1),
            Value::string("a"),
            Value::Integer(99)
        ]]
    );

    // The row was mutated in place; no new row appeared.
    assert_eq!(
        query(&mut engine, "SELECT * FROM t ORDER BY id"),
        vec![
            vec![Value::Integer(1), Value::string("a"), Value::Integer(99)],
            vec![Value::Integer(2), Value::string("b"), Value::Integer(20)],
        ]
    );
}

#[test]
fn test_on_conflict_do_nothing() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (name VARCHAR UNIQUE, age INT)")
        .unwrap();
    engine
        .execute("INSERT INTO t VALUES ('a', 1)")
        .unwrap();

    let result = engine
        .execute("INSERT INTO t VALUES ('a', 2), ('b', 3) ON CONFLICT DO NOTHING")
        .unwrap();
    assert_eq!(
        result,
        ExecutionResult::Modified {
            status: "INSERT".into(),
            count: 1
        }
    );
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM t"), 2);

    // RETURNING omits the skipped rows.
    let returned = rows(engine
        .execute("INSERT INTO t VALUES ('a', 4), ('c', 5) ON CONFLICT DO NOTHING RETURNING name")
        .unwrap());
    assert_eq!(returned, vec![vec![Value::string("c")]]);
}

#[test]
fn test_three_valued_logic() {
    let mut engine = engine();
    engine.execute("CREATE TABLE u (x INT)").unwrap();
    engine
        .execute("INSERT INTO u VALUES (1), (NULL), (2)")
        .unwrap();

    // NULL <> 1 is NULL and the row is discarded.
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM u WHERE x <> 1"), 1);
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM u WHERE x IS NULL"),
        1
    );
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM u WHERE x IS NOT NULL"),
        2
    );
}

#[test]
fn test_three_valued_truth_tables() {
    let mut engine = engine();
    let truth = |engine: &mut Engine, sql: &str| query(engine, sql)[0][0].clone();

    // AND
    assert_eq!(
        truth(&mut engine, "SELECT NULL AND FALSE"),
        Value::Boolean(false)
    );
    assert_eq!(truth(&mut engine, "SELECT NULL AND TRUE"), Value::Null);
    assert_eq!(truth(&mut engine, "SELECT NULL AND NULL"), Value::Null);
    assert_eq!(
        truth(&mut engine, "SELECT TRUE AND TRUE"),
        Value::Boolean(true)
    );
    assert_eq!(
        truth(&mut engine, "SELECT FALSE AND TRUE"),
        Value::Boolean(false)
    );
    // OR
    assert_eq!(
        truth(&mut engine, "SELECT NULL OR TRUE"),
        Value::Boolean(true)
    );
    assert_eq!(truth(&mut engine, "SELECT NULL OR FALSE"), Value::Null);
    assert_eq!(truth(&mut engine, "SELECT NULL OR NULL"), Value::Null);
    assert_eq!(
        truth(&mut engine, "SELECT FALSE OR FALSE"),
        Value::Boolean(false)
    );
    // NOT
    assert_eq!(truth(&mut engine, "SELECT NOT NULL"), Value::Null);
    assert_eq!(
        truth(&mut engine, "SELECT NOT TRUE"),
        Value::Boolean(false)
    );
    // Comparisons with NULL are NULL.
    assert_eq!(truth(&mut engine, "SELECT NULL = NULL"), Value::Null);
    assert_eq!(truth(&mut engine, "SELECT 1 < NULL"), Value::Null);
}

fn group_fixture() -> Engine {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE s (g VARCHAR, v INT)")
        .unwrap();
    engine
        .execute("INSERT INTO s VALUES ('a',1),('a',3),('b',5),('b',NULL),('c',2)")
        .unwrap();
    engine
}

#[test]
fn test_group_having_order() {
    let mut engine = group_fixture();
    assert_eq!(
        query(
            &mut engine,
            "SELECT g, SUM(v) AS tot FROM s GROUP BY g HAVING SUM(v) > 2 ORDER BY tot DESC"
        ),
        vec![
            vec![Value::string("b"), Value::Integer(5)],
            vec![Value::string("a"), Value::Integer(4)],
        ]
    );
}

#[test]
fn test_aggregate_null_semantics() {
    let mut engine = group_fixture();
    // COUNT(*) counts all rows; COUNT(v) only non-NULL.
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM s"), 5);
    assert_eq!(count(&mut engine, "SELECT COUNT(v) FROM s"), 4);

    // SUM/MIN/MAX over no rows are NULL; COUNT is 0.
    let empty = query(
        &mut engine,
        "SELECT SUM(v), MIN(v), MAX(v), AVG(v), COUNT(v) FROM s WHERE v > 100",
    );
    assert_eq!(
        empty,
        vec![vec![
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Integer(0)
        ]]
    );

    // DISTINCT aggregates deduplicate their inputs.
    engine.execute("INSERT INTO s VALUES ('a', 1)").unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(v) FROM s"), 5);
    assert_eq!(count(&mut engine, "SELECT COUNT(DISTINCT v) FROM s"), 4);
}

#[test]
fn test_ungrouped_column_rejected() {
    let mut engine = group_fixture();
    assert!(matches!(
        engine.execute("SELECT g, v FROM s GROUP BY g"),
        Err(Error::ExecutionError(_))
    ));
}

#[test]
fn test_cte_set_op_subquery() {
    let mut engine = group_fixture();
    let mut result = query(
        &mut engine,
        "WITH hi AS (SELECT v FROM s WHERE v > 1) \
         SELECT v FROM hi \
         UNION \
         SELECT v FROM s WHERE v = (SELECT MIN(v) FROM s)",
    );
    result.sort();
    assert_eq!(
        result,
        vec![
            vec![Value::Integer(1)],
            vec![Value::Integer(2)],
            vec![Value::Integer(3)],
            vec![Value::Integer(5)],
        ]
    );
}

#[test]
fn test_materialized_view_staleness() {
    let mut engine = group_fixture();
    engine
        .execute("CREATE MATERIALIZED VIEW mv AS SELECT COUNT(*) AS c FROM s")
        .unwrap();
    assert_eq!(count(&mut engine, "SELECT c FROM mv"), 5);

    // The cache keeps serving after DML until an explicit refresh.
    engine.execute("INSERT INTO s VALUES ('d',7)").unwrap();
    assert_eq!(count(&mut engine, "SELECT c FROM mv"), 5);
    assert!(engine.catalog().current().unwrap().materialized["mv"].stale);

    engine.execute("REFRESH MATERIALIZED VIEW mv").unwrap();
    assert_eq!(count(&mut engine, "SELECT c FROM mv"), 6);
    assert!(!engine.catalog().current().unwrap().materialized["mv"].stale);
}

#[test]
fn test_view_reflects_updates() {
    let mut engine = group_fixture();
    engine
        .execute("CREATE VIEW big AS SELECT g, v FROM s WHERE v >= 3")
        .unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM big"), 2);
    engine.execute("INSERT INTO s VALUES ('z', 9)").unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM big"), 3);

    // Views are read-only.
    assert!(matches!(
        engine.execute("INSERT INTO big VALUES ('x', 1)"),
        Err(Error::NotATable(_))
    ));
    // REFRESH only applies to materialized views.
    assert!(matches!(
        engine.execute("REFRESH MATERIALIZED VIEW big"),
        Err(Error::NotMaterialized(_))
    ));

    engine.execute("DROP VIEW big").unwrap();
    assert!(matches!(
        engine.execute("SELECT * FROM big"),
        Err(Error::TableNotFound(_))
    ));
}

#[test]
fn test_cte_shadows_table() {
    let mut engine = group_fixture();
    // A CTE named like a table wins during the statement.
    assert_eq!(
        count(
            &mut engine,
            "WITH s AS (SELECT 1 AS one) SELECT COUNT(*) FROM s"
        ),
        1
    );
    // And the real table is back afterwards.
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM s"), 5);
    // Duplicate CTE names collide.
    assert!(engine
        .execute("WITH c AS (SELECT 1), c AS (SELECT 2) SELECT * FROM c")
        .is_err());
}

#[test]
fn test_set_operation_algebra() {
    let mut engine = group_fixture();

    // UNION ALL is commutative up to ordering.
    let mut ab = query(
        &mut engine,
        "SELECT v FROM s WHERE v > 1 UNION ALL SELECT v FROM s WHERE v < 3",
    );
    let mut ba = query(
        &mut engine,
        "SELECT v FROM s WHERE v < 3 UNION ALL SELECT v FROM s WHERE v > 1",
    );
    ab.sort();
    ba.sort();
    assert_eq!(ab, ba);

    // UNION is set-equal regardless of branch order.
    let mut ab = query(
        &mut engine,
        "SELECT v FROM s WHERE v > 1 UNION SELECT v FROM s WHERE v < 3",
    );
    let mut ba = query(
        &mut engine,
        "SELECT v FROM s WHERE v < 3 UNION SELECT v FROM s WHERE v > 1",
    );
    ab.sort();
    ba.sort();
    assert_eq!(ab, ba);

    // A INTERSECT A = A (distinct); A EXCEPT A = empty.
    let mut identity = query(&mut engine, "SELECT v FROM s INTERSECT SELECT v FROM s");
    identity.sort();
    let mut distinct = query(&mut engine, "SELECT DISTINCT v FROM s");
    distinct.sort();
    assert_eq!(identity, distinct);
    assert!(query(&mut engine, "SELECT v FROM s EXCEPT SELECT v FROM s").is_empty());

    // Arity mismatch is a schema error.
    assert!(matches!(
        engine.execute("SELECT g, v FROM s UNION SELECT v FROM s"),
        Err(Error::SetOperationMismatch(_))
    ));
}

#[test]
fn test_distinct_is_idempotent() {
    let mut engine = group_fixture();
    let once = query(&mut engine, "SELECT DISTINCT v FROM s");
    let twice = query(
        &mut engine,
        "SELECT DISTINCT v FROM (SELECT DISTINCT v FROM s) AS d",
    );
    assert_eq!(once, twice);
    // NULL equals NULL for DISTINCT purposes.
    engine.execute("INSERT INTO s VALUES ('x', NULL)").unwrap();
    let nulls: Vec<_> = query(&mut engine, "SELECT DISTINCT v FROM s")
        .into_iter()
        .filter(|row| row[0].is_null())
        .collect();
    assert_eq!(nulls.len(), 1);
}

#[test]
fn test_count_star_matches_row_count() {
    let mut engine = group_fixture();
    for predicate in ["v > 1", "v IS NULL", "g = 'a'", "v <> 2"] {
        let counted = count(
            &mut engine,
            &format!("SELECT COUNT(*) FROM s WHERE {}", predicate),
        );
        let delivered = query(&mut engine, &format!("SELECT * FROM s WHERE {}", predicate));
        assert_eq!(counted as usize, delivered.len(), "predicate {}", predicate);
    }
}

#[test]
fn test_failed_statement_leaves_catalog_unchanged() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE a (x INT UNIQUE, y INT CHECK (y > 0))")
        .unwrap();
    engine.execute("INSERT INTO a VALUES (1, 10)").unwrap();
    let snapshot = engine.catalog().clone();

    // Multi-row insert where the second row violates UNIQUE: nothing of
    // the statement survives.
    assert!(engine.execute("INSERT INTO a VALUES (2, 20), (1, 30)").is_err());
    assert_eq!(engine.catalog(), &snapshot);

    // Update violating CHECK rolls back the whole statement.
    assert!(engine.execute("UPDATE a SET y = y - 100").is_err());
    assert_eq!(engine.catalog(), &snapshot);

    // Failed ALTER leaves the schema alone.
    assert!(engine
        .execute("ALTER TABLE a ADD CONSTRAINT bad CHECK (y > 99)")
        .is_err());
    assert_eq!(engine.catalog(), &snapshot);
}

#[test]
fn test_batch_stops_at_first_error() {
    let mut engine = engine();
    let result = engine.execute_batch(
        "CREATE TABLE b (x INT); \
         INSERT INTO b VALUES (1); \
         INSERT INTO nonexistent VALUES (2); \
         INSERT INTO b VALUES (3);",
    );
    assert!(matches!(result, Err(Error::TableNotFound(_))));
    // Statement 2 committed; statement 4 never ran.
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM b"), 1);
}

#[test]
fn test_order_by_null_placement() {
    let mut engine = engine();
    engine.execute("CREATE TABLE u (x INT)").unwrap();
    engine
        .execute("INSERT INTO u VALUES (2), (NULL), (1)")
        .unwrap();
    assert_eq!(
        query(&mut engine, "SELECT x FROM u ORDER BY x"),
        vec![
            vec![Value::Integer(1)],
            vec![Value::Integer(2)],
            vec![Value::Null]
        ]
    );
    assert_eq!(
        query(&mut engine, "SELECT x FROM u ORDER BY x DESC"),
        vec![
            vec![Value::Null],
            vec![Value::Integer(2)],
            vec![Value::Integer(1)]
        ]
    );
}

#[test]
fn test_order_by_alias_position_and_expression() {
    let mut engine = group_fixture();
    // By alias.
    let by_alias = query(
        &mut engine,
        "SELECT v AS val FROM s WHERE v IS NOT NULL ORDER BY val",
    );
    // By 1-based position.
    let by_position = query(
        &mut engine,
        "SELECT v AS val FROM s WHERE v IS NOT NULL ORDER BY 1",
    );
    assert_eq!(by_alias, by_position);
    assert_eq!(by_alias[0], vec![Value::Integer(1)]);

    // By an expression over a column that is not projected.
    assert_eq!(
        query(
            &mut engine,
            "SELECT g FROM s WHERE v IS NOT NULL ORDER BY v * -1 LIMIT 1"
        ),
        vec![vec![Value::string("b")]]
    );
}

#[test]
fn test_limit_offset() {
    let mut engine = engine();
    engine.execute("CREATE TABLE n (x INT)").unwrap();
    engine
        .execute("INSERT INTO n VALUES (1), (2), (3), (4), (5)")
        .unwrap();
    assert_eq!(
        query(&mut engine, "SELECT x FROM n ORDER BY x LIMIT 2 OFFSET 1"),
        vec![vec![Value::Integer(2)], vec![Value::Integer(3)]]
    );
    assert!(matches!(
        engine.execute("SELECT x FROM n LIMIT -1"),
        Err(Error::InvalidValue(_))
    ));
    assert!(matches!(
        engine.execute("SELECT x FROM n OFFSET -2"),
        Err(Error::InvalidValue(_))
    ));
}

#[test]
fn test_scalar_subquery_cardinality() {
    let mut engine = engine();
    engine.execute("CREATE TABLE u (x INT)").unwrap();
    engine
        .execute("INSERT INTO u VALUES (1), (2)")
        .unwrap();
    assert!(matches!(
        engine.execute("SELECT (SELECT x FROM u)"),
        Err(Error::ScalarSubqueryTooManyRows)
    ));
    // Zero rows yield NULL.
    assert_eq!(
        query(&mut engine, "SELECT (SELECT x FROM u WHERE x > 10)"),
        vec![vec![Value::Null]]
    );
}

#[test]
fn test_correlated_subquery() {
    let mut engine = group_fixture();
    assert_eq!(
        query(
            &mut engine,
            "SELECT g, v FROM s AS o \
             WHERE v = (SELECT MAX(v) FROM s WHERE g = o.g) ORDER BY g"
        ),
        vec![
            vec![Value::string("a"), Value::Integer(3)],
            vec![Value::string("b"), Value::Integer(5)],
            vec![Value::string("c"), Value::Integer(2)],
        ]
    );
}

#[test]
fn test_in_exists_between_like() {
    let mut engine = group_fixture();
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM s WHERE g IN ('a', 'c')"),
        3
    );
    // x NOT IN (...) with NULLs on the left is never TRUE.
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM s WHERE v NOT IN (1, 2)"),
        2
    );
    assert_eq!(
        count(
            &mut engine,
            "SELECT COUNT(*) FROM s WHERE v IN (SELECT v FROM s WHERE v > 2)"
        ),
        2
    );
    assert_eq!(
        count(
            &mut engine,
            "SELECT COUNT(*) FROM s WHERE EXISTS (SELECT 1 FROM s WHERE v > 4)"
        ),
        5
    );
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM s WHERE v BETWEEN 2 AND 3"),
        2
    );
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM s WHERE g LIKE '_'"),
        5
    );
    assert_eq!(
        count(&mut engine, "SELECT COUNT(*) FROM s WHERE g ILIKE 'A%'"),
        2
    );
}

#[test]
fn test_scalar_functions() {
    let mut engine = engine();
    let one = |engine: &mut Engine, sql: &str| query(engine, sql)[0][0].clone();

    assert_eq!(one(&mut engine, "SELECT UPPER('abc')"), Value::string("ABC"));
    assert_eq!(one(&mut engine, "SELECT LOWER('AbC')"), Value::string("abc"));
    assert_eq!(one(&mut engine, "SELECT LENGTH('hello')"), Value::Integer(5));
    assert_eq!(
        one(&mut engine, "SELECT SUBSTRING('hello world', 7)"),
        Value::string("world")
    );
    assert_eq!(
        one(&mut engine, "SELECT SUBSTRING('hi', 10)"),
        Value::string("")
    );
    assert!(engine.execute("SELECT SUBSTRING('hi', 1, -1)").is_err());
    assert_eq!(
        one(&mut engine, "SELECT CONCAT('a', 1, 'b')"),
        Value::string("a1b")
    );
    assert_eq!(one(&mut engine, "SELECT CONCAT('a', NULL)"), Value::Null);
    assert_eq!(
        one(&mut engine, "SELECT REPLACE('banana', 'an', 'x')"),
        Value::string("bxxa")
    );
    assert_eq!(
        one(&mut engine, "SELECT TRIM('  pad  ')"),
        Value::string("pad")
    );

    assert_eq!(one(&mut engine, "SELECT ABS(-3)"), Value::Integer(3));
    assert_eq!(one(&mut engine, "SELECT CEIL(1.2)"), Value::Float(2.0));
    assert_eq!(one(&mut engine, "SELECT FLOOR(1.8)"), Value::Float(1.0));
    assert_eq!(one(&mut engine, "SELECT ROUND(2.5)"), Value::Float(3.0));
    assert_eq!(one(&mut engine, "SELECT ROUND(-2.5)"), Value::Float(-3.0));

    assert_eq!(
        one(&mut engine, "SELECT COALESCE(NULL, NULL, 7, 8)"),
        Value::Integer(7)
    );
    assert_eq!(one(&mut engine, "SELECT COALESCE(NULL, NULL)"), Value::Null);
    assert_eq!(one(&mut engine, "SELECT NULLIF(1, 1)"), Value::Null);
    assert_eq!(one(&mut engine, "SELECT NULLIF(1, 2)"), Value::Integer(1));

    assert!(matches!(
        engine.execute("SELECT NO_SUCH_FUNCTION(1)"),
        Err(Error::UnknownFunction(_))
    ));
}

#[test]
fn test_date_time_functions() {
    let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let now = date.and_hms_opt(10, 30, 0).unwrap();
    let mut engine = Engine::new().with_clock(Box::new(FixedClock(now)));
    engine
        .execute_batch("CREATE DATABASE test; USE test;")
        .unwrap();

    assert_eq!(
        query(&mut engine, "SELECT CURRENT_DATE")[0][0],
        Value::Date(date)
    );
    assert_eq!(
        query(&mut engine, "SELECT NOW()")[0][0],
        Value::Timestamp(now)
    );
    assert_eq!(
        query(&mut engine, "SELECT EXTRACT(YEAR FROM DATE '2023-03-09')")[0][0],
        Value::Integer(2023)
    );
    assert_eq!(
        query(
            &mut engine,
            "SELECT EXTRACT(MINUTE FROM TIMESTAMP '2023-03-09 04:05:06')"
        )[0][0],
        Value::Integer(5)
    );
    assert_eq!(
        query(
            &mut engine,
            "SELECT DATEDIFF(DATE '2024-03-10', DATE '2024-03-01')"
        )[0][0],
        Value::Integer(9)
    );
}

#[test]
fn test_cast_conversions() {
    let mut engine = engine();
    let one = |engine: &mut Engine, sql: &str| query(engine, sql)[0][0].clone();

    assert_eq!(one(&mut engine, "SELECT CAST('42' AS INT)"), Value::Integer(42));
    assert_eq!(one(&mut engine, "SELECT CAST(2.5 AS INT)"), Value::Integer(3));
    assert_eq!(one(&mut engine, "SELECT CAST(3 AS FLOAT)"), Value::Float(3.0));
    assert_eq!(
        one(&mut engine, "SELECT CAST(42 AS TEXT)"),
        Value::string("42")
    );
    assert_eq!(
        one(&mut engine, "SELECT CAST('2024-02-29' AS DATE)"),
        Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    );
    assert_eq!(one(&mut engine, "SELECT CAST(NULL AS INT)"), Value::Null);
    assert!(matches!(
        engine.execute("SELECT CAST('nope' AS INT)"),
        Err(Error::InvalidCast { .. })
    ));
    assert!(matches!(
        engine.execute("SELECT CAST('13/01/2024' AS DATE)"),
        Err(Error::InvalidCast { .. })
    ));
}

#[test]
fn test_case_expressions() {
    let mut engine = group_fixture();
    assert_eq!(
        query(
            &mut engine,
            "SELECT CASE WHEN v >= 3 THEN 'big' WHEN v >= 2 THEN 'mid' ELSE 'small' END \
             FROM s WHERE g = 'a' ORDER BY v"
        ),
        vec![vec![Value::string("small")], vec![Value::string("big")]]
    );
    // No match without ELSE yields NULL.
    assert_eq!(
        query(&mut engine, "SELECT CASE WHEN FALSE THEN 1 END"),
        vec![vec![Value::Null]]
    );
    // Simple CASE with operand.
    assert_eq!(
        query(&mut engine, "SELECT CASE 2 WHEN 1 THEN 'one' WHEN 2 THEN 'two' END"),
        vec![vec![Value::string("two")]]
    );
}

#[test]
fn test_arithmetic_errors() {
    let mut engine = engine();
    assert!(matches!(
        engine.execute("SELECT 1 / 0"),
        Err(Error::DivisionByZero)
    ));
    assert!(matches!(
        engine.execute("SELECT 1.0 / 0.0"),
        Err(Error::DivisionByZero)
    ));
    assert!(matches!(
        engine.execute("SELECT 5 % 0"),
        Err(Error::DivisionByZero)
    ));
    // Modulo takes the divisor's sign.
    assert_eq!(query(&mut engine, "SELECT -7 % 3"), vec![vec![Value::Integer(2)]]);
    assert_eq!(query(&mut engine, "SELECT 7 % -3"), vec![vec![Value::Integer(-2)]]);
}

#[test]
fn test_insert_variants() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE d (id SERIAL PRIMARY KEY, v INT DEFAULT 42, note TEXT)")
        .unwrap();

    engine.execute("INSERT INTO d (v) VALUES (DEFAULT)").unwrap();
    engine.execute("INSERT INTO d DEFAULT VALUES").unwrap();
    engine
        .execute("INSERT INTO d (v, note) VALUES (7, 'x')")
        .unwrap();
    assert_eq!(
        query(&mut engine, "SELECT id, v FROM d ORDER BY id"),
        vec![
            vec![Value::Integer(1), Value::Integer(42)],
            vec![Value::Integer(2), Value::Integer(42)],
            vec![Value::Integer(3), Value::Integer(7)],
        ]
    );

    // INSERT ... SELECT.
    engine.execute("CREATE TABLE d2 (v INT)").unwrap();
    engine
        .execute("INSERT INTO d2 SELECT v FROM d ORDER BY id")
        .unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM d2"), 3);

    // Type mismatches and length overruns are rejected.
    assert!(matches!(
        engine.execute("INSERT INTO d2 VALUES ('oops')"),
        Err(Error::TypeMismatch { .. })
    ));
    engine
        .execute("CREATE TABLE short (s VARCHAR(3))")
        .unwrap();
    assert!(matches!(
        engine.execute("INSERT INTO short VALUES ('toolong')"),
        Err(Error::ValueTooLong { .. })
    ));
}

#[test]
fn test_update_from_snapshot_and_returning() {
    let mut engine = engine();
    engine.execute("CREATE TABLE p (a INT, b INT)").unwrap();
    engine.execute("INSERT INTO p VALUES (1, 10)").unwrap();

    // SET expressions see the pre-update row, not earlier assignments.
    engine.execute("UPDATE p SET a = b, b = a").unwrap();
    assert_eq!(
        query(&mut engine, "SELECT a, b FROM p"),
        vec![vec![Value::Integer(10), Value::Integer(1)]]
    );

    let returned = rows(engine
        .execute("UPDATE p SET a = a + 1 RETURNING a, b")
        .unwrap());
    assert_eq!(returned, vec![vec![Value::Integer(11), Value::Integer(1)]]);

    let deleted = rows(engine.execute("DELETE FROM p WHERE a = 11 RETURNING *").unwrap());
    assert_eq!(deleted, vec![vec![Value::Integer(11), Value::Integer(1)]]);
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM p"), 0);
}

#[test]
fn test_unique_swap_within_statement() {
    let mut engine = engine();
    engine.execute("CREATE TABLE q (x INT UNIQUE)").unwrap();
    engine.execute("INSERT INTO q VALUES (1), (2)").unwrap();
    // Swapping unique values within one statement is legal because
    // constraints are re-checked against the final state.
    engine.execute("UPDATE q SET x = 3 - x").unwrap();
    let mut result = query(&mut engine, "SELECT x FROM q");
    result.sort();
    assert_eq!(result, vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
}

#[test]
fn test_serial_counter_never_reused() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (id SERIAL PRIMARY KEY, v INT)")
        .unwrap();
    engine.execute("INSERT INTO t (v) VALUES (1), (2)").unwrap();
    engine.execute("DELETE FROM t WHERE id = 2").unwrap();
    engine.execute("INSERT INTO t (v) VALUES (3)").unwrap();
    assert_eq!(
        query(&mut engine, "SELECT id FROM t ORDER BY id"),
        vec![vec![Value::Integer(1)], vec![Value::Integer(3)]]
    );
}

#[test]
fn test_alter_table() {
    let mut engine = engine();
    engine.execute("CREATE TABLE t (a INT)").unwrap();
    engine.execute("INSERT INTO t VALUES (1), (2)").unwrap();

    // ADD COLUMN backfills the default.
    engine
        .execute("ALTER TABLE t ADD COLUMN b INT DEFAULT 9")
        .unwrap();
    assert_eq!(
        query(&mut engine, "SELECT b FROM t"),
        vec![vec![Value::Integer(9)], vec![Value::Integer(9)]]
    );

    // ADD COLUMN NOT NULL without a default fails on a populated table.
    assert!(matches!(
        engine.execute("ALTER TABLE t ADD COLUMN c INT NOT NULL"),
        Err(Error::NullConstraintViolation(_))
    ));

    // RENAME COLUMN and RENAME TO.
    engine.execute("ALTER TABLE t RENAME COLUMN b TO bee").unwrap();
    assert_eq!(count(&mut engine, "SELECT COUNT(bee) FROM t"), 2);
    engine.execute("ALTER TABLE t RENAME TO t2").unwrap();
    assert!(matches!(
        engine.execute("SELECT * FROM t"),
        Err(Error::TableNotFound(_))
    ));
    assert_eq!(count(&mut engine, "SELECT COUNT(*) FROM t2"), 2);

    // ADD CONSTRAINT validates existing rows.
    engine.execute("INSERT INTO t2 VALUES (1, 5)").unwrap();
    assert!(matches!(
        engine.execute("ALTER TABLE t2 ADD CONSTRAINT u UNIQUE (a)"),
        Err(Error::UniqueConstraintViolation(_))
    ));
    engine
        .execute("ALTER TABLE t2 ADD CONSTRAINT bees UNIQUE (bee)")
        .unwrap_err();
    engine
        .execute("ALTER TABLE t2 ADD CONSTRAINT pos CHECK (a > 0)")
        .unwrap();
    assert!(matches!(
        engine.execute("INSERT INTO t2 VALUES (-1, 1)"),
        Err(Error::CheckConstraintViolation(_))
    ));
    engine.execute("ALTER TABLE t2 DROP CONSTRAINT pos").unwrap();
    engine.execute("INSERT INTO t2 VALUES (-1, 1)").unwrap();

    // DROP COLUMN is rejected while a CHECK references the column.
    engine
        .execute("CREATE TABLE guard (x INT, y INT CHECK (x > 0))")
        .unwrap();
    assert!(engine.execute("ALTER TABLE guard DROP COLUMN x").is_err());
    engine.execute("ALTER TABLE guard DROP COLUMN y").unwrap();
}

#[test]
fn test_if_exists_suppression() {
    let mut engine = engine();
    engine.execute("CREATE TABLE t (x INT)").unwrap();
    engine.execute("CREATE TABLE IF NOT EXISTS t (y INT)").unwrap();
    // The original schema survives.
    assert!(engine.execute("SELECT x FROM t").is_ok());

    engine.execute("DROP TABLE IF EXISTS missing").unwrap();
    assert!(matches!(
        engine.execute("DROP TABLE missing"),
        Err(Error::TableNotFound(_))
    ));

    engine.execute("CREATE DATABASE IF NOT EXISTS test").unwrap();
    engine.execute("DROP DATABASE IF EXISTS nothere").unwrap();
    engine.execute("DROP VIEW IF EXISTS noview").unwrap();
}

#[test]
fn test_no_database_selected() {
    let mut engine = Engine::new();
    assert_eq!(
        engine.execute("CREATE TABLE t (x INT)").unwrap_err(),
        Error::NoDatabaseSelected
    );
    // Constant selects work without a database.
    assert_eq!(
        rows(engine.execute("SELECT 1 + 1").unwrap()),
        vec![vec![Value::Integer(2)]]
    );
    assert_eq!(
        engine.execute("USE missing").unwrap_err(),
        Error::DatabaseNotFound("missing".into())
    );
}

#[test]
fn test_snapshot_save_and_load() {
    let mut engine = engine();
    engine
        .execute("CREATE TABLE t (id SERIAL PRIMARY KEY, name TEXT)")
        .unwrap();
    engine
        .execute("INSERT INTO t (name) VALUES ('a'), ('b')")
        .unwrap();

    engine.save_database("test").unwrap();
    assert_eq!(engine.list_snapshots().unwrap(), vec!["test".to_string()]);

    engine.execute("DROP DATABASE test").unwrap();
    assert_eq!(engine.execute("USE test").unwrap_err(), Error::DatabaseNotFound("test".into()));

    engine.load_database("test").unwrap();
    engine.execute("USE test").unwrap();
    assert_eq!(
        query(&mut engine, "SELECT id, name FROM t ORDER BY id"),
        vec![
            vec![Value::Integer(1), Value::string("a")],
            vec![Value::Integer(2), Value::string("b")],
        ]
    );
    // The serial counter survives the round trip.
    engine.execute("INSERT INTO t (name) VALUES ('c')").unwrap();
    assert_eq!(
        query(&mut engine, "SELECT MAX(id) FROM t")[0][0],
        Value::Integer(3)
    );

    assert!(matches!(
        engine.load_database("absent"),
        Err(Error::SnapshotNotFound(_))
    ));
}

#[test]
fn test_error_positions() {
    let mut engine = engine();
    match engine.execute("SELECT * FRM t") {
        Err(Error::Syntax { position, .. }) => assert_eq!(position, 9),
        other => panic!("expected syntax error, got {:?}", other),
    }
    match engine.execute("SELECT 'abc") {
        Err(Error::Lexical { position, .. }) => assert_eq!(position, 7),
        other => panic!("expected lexical error, got {:?}", other),
    }
}

#[test]
fn test_parse_print_parse_roundtrip() {
    let statements = [
        "SELECT 1 + 2 * 3",
        "SELECT DISTINCT g, SUM(v) AS tot FROM s WHERE v > 1 AND g LIKE 'a%' \
         GROUP BY g HAVING COUNT(*) > 1 ORDER BY tot DESC, g ASC LIMIT 5 OFFSET 2",
        "WITH hi AS (SELECT v FROM s WHERE v > 1) SELECT v FROM hi \
         UNION ALL SELECT v FROM s INTERSECT SELECT v FROM s",
        "SELECT CASE WHEN v IS NULL THEN 0 ELSE v END FROM s",
        "SELECT CASE v WHEN 1 THEN 'one' ELSE 'other' END FROM s",
        "SELECT CAST(v AS FLOAT), COALESCE(v, 0), NULLIF(g, 'a') FROM s",
        "SELECT COUNT(DISTINCT v), EXTRACT(YEAR FROM d) FROM s",
        "SELECT * FROM (SELECT v FROM s) AS sub WHERE v BETWEEN 1 AND 10",
        "SELECT v FROM s WHERE v IN (SELECT v FROM s WHERE v > 2) OR NOT EXISTS (SELECT 1)",
        "SELECT v FROM s WHERE v NOT IN (1, 2) AND g NOT LIKE 'x%' AND v IS NOT NULL",
        "SELECT DATE '2024-01-02', TIME '03:04:05', TIMESTAMP '2024-01-02 03:04:05'",
        "SELECT -v, +v, v % 2, CURRENT_DATE FROM s",
        "INSERT INTO t (a, b) VALUES (1, DEFAULT), (2, 3) \
         ON CONFLICT (a) DO UPDATE SET b = 4 RETURNING *",
        "INSERT INTO t DEFAULT VALUES",
        "INSERT INTO t SELECT v FROM s",
        "UPDATE t SET a = a + 1, b = DEFAULT WHERE a < 10 RETURNING a",
        "DELETE FROM t WHERE a IS NULL RETURNING *",
        "CREATE TABLE t (id SERIAL PRIMARY KEY, name VARCHAR(50) NOT NULL UNIQUE, \
         age INT DEFAULT 0 CHECK (age >= 0), CONSTRAINT u UNIQUE (name, age))",
        "CREATE TABLE IF NOT EXISTS t (x INT NULL)",
        "ALTER TABLE t ADD COLUMN c TEXT",
        "ALTER TABLE t DROP COLUMN c",
        "ALTER TABLE t ADD CONSTRAINT chk CHECK (c > 0)",
        "ALTER TABLE t RENAME COLUMN a TO b",
        "ALTER TABLE t RENAME TO u",
        "DROP TABLE IF EXISTS a, b",
        "CREATE VIEW v AS SELECT 1 AS one",
        "CREATE MATERIALIZED VIEW mv AS SELECT COUNT(*) AS c FROM s",
        "REFRESH MATERIALIZED VIEW mv",
        "DROP MATERIALIZED VIEW mv",
        "CREATE DATABASE IF NOT EXISTS d",
        "DROP DATABASE d",
        "USE d",
    ];
    for sql in statements {
        let first = Parser::parse(sql).unwrap_or_else(|e| panic!("parse {}: {}", sql, e));
        let printed = first.to_string();
        let second = Parser::parse(&printed)
            .unwrap_or_else(|e| panic!("reparse of {:?} (printed {:?}): {}", sql, printed, e));
        assert_eq!(first, second, "round trip changed the AST for {:?}", sql);
    }
}
