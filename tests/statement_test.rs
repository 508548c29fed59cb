// tests/statement_test.rs
#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use querygen::prelude::*;

    fn render(dialect: Dialect, statement: impl Into<Statement>) -> GenerateResult<RenderedQuery> {
        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(dialect.provider(), &functions);
        statement.into().render(&ctx)
    }

    // ------------------------------------------------------------------------
    // UPDATE / DELETE
    // ------------------------------------------------------------------------

    #[test]
    fn update_basic() {
        let update = UpdateQuery::new("Document", "d")
            .set("d.name", lit_str("draft"))
            .set("d.age", path("d.age").add(1))
            .filter(path("d.id").eq(param("id")));
        let rendered = render(Dialect::EclipseLink, update).unwrap();
        assert_snapshot!(rendered.text, @"UPDATE Document d SET d.name = 'draft', d.age = d.age + 1 WHERE d.id = :id");
        assert_eq!(rendered.parameters, vec!["id"]);
        assert!(rendered.returning.is_empty());
    }

    #[test]
    fn update_without_assignments_is_rejected() {
        let err = render(Dialect::Hibernate, UpdateQuery::new("Document", "d")).unwrap_err();
        assert_eq!(err, GenerateError::invalid("UPDATE without assignments"));
    }

    #[test]
    fn update_returning() {
        let update = UpdateQuery::new("Document", "d")
            .set("d.archived", true)
            .returning(vec!["d.id", "d.name"]);

        let rendered = render(Dialect::Hibernate, update.clone()).unwrap();
        assert_snapshot!(rendered.text, @"UPDATE Document d SET d.archived = true RETURNING d.id, d.name");
        assert_eq!(rendered.returning, vec!["d.id", "d.name"]);

        let err = render(Dialect::EclipseLink, update).unwrap_err();
        assert_eq!(
            err,
            GenerateError::unsupported("eclipselink", "RETURNING clause is not supported")
        );
    }

    #[test]
    fn delete_basic() {
        let delete = DeleteQuery::new("Document", "d").filter(path("d.archived").eq(true));
        assert_snapshot!(render(Dialect::EclipseLink, delete.clone()).unwrap().text, @"DELETE FROM Document d WHERE d.archived = TRUE");
        assert_snapshot!(render(Dialect::Hibernate, delete).unwrap().text, @"DELETE FROM Document d WHERE d.archived = true");
    }

    #[test]
    fn delete_collection() {
        let delete = DeleteCollectionQuery::new("Document", "d", "people")
            .filter(path("d.id").eq(1));
        let sql = render(Dialect::Hibernate, delete.clone()).unwrap().text;
        assert_snapshot!(sql, @"DELETE FROM Document(people) d WHERE d.id = 1");

        let err = render(Dialect::OpenJpa, delete).unwrap_err();
        assert_eq!(
            err,
            GenerateError::unsupported("openjpa", "DELETE on collection 'people' is not supported")
        );
    }

    #[test]
    fn delete_collection_cannot_be_copied() {
        let statement = Statement::from(DeleteCollectionQuery::new("Document", "d", "people"));
        assert_eq!(
            statement.copy().unwrap_err(),
            GenerateError::UnsupportedForVariant {
                variant: "DeleteCollectionQuery",
                operation: "copy",
            }
        );
    }

    // ------------------------------------------------------------------------
    // CTEs
    // ------------------------------------------------------------------------

    fn active_people() -> SelectQuery {
        SelectQuery::from_entity("Person", "p")
            .select(path("p.id"))
            .select(path("p.name"))
            .filter(path("p.active").eq(true))
    }

    fn documents_with(cte: Cte) -> SelectQuery {
        let mut q = SelectQuery::from_entity("Document", "d").with_cte(cte);
        q.join_entity(
            "d",
            "PersonCte",
            "c",
            JoinType::Inner,
            path("c.id").eq(path("d.ownerId")),
        )
        .unwrap();
        q.select(path("d.name")).select(path("c.name"))
    }

    #[test]
    fn cte_joined_as_entity() {
        let q = documents_with(Cte::new("PersonCte", vec!["id", "name"], active_people()));
        let sql = render(Dialect::Hibernate, q).unwrap().text;
        assert_snapshot!(sql, @"WITH PersonCte(id, name) AS(SELECT p.id, p.name FROM Person p WHERE p.active = true) SELECT d.name, c.name FROM Document d JOIN PersonCte c WITH c.id = d.ownerId");
    }

    #[test]
    fn cte_requires_with_clause_support() {
        let q = documents_with(Cte::new("PersonCte", vec!["id", "name"], active_people()));
        let err = render(Dialect::EclipseLink, q).unwrap_err();
        assert_eq!(
            err,
            GenerateError::unsupported("eclipselink", "WITH clause is not supported")
        );
    }

    #[test]
    fn cte_attribute_count_must_match() {
        let q = documents_with(Cte::new("PersonCte", vec!["id"], active_people()));
        let err = render(Dialect::Hibernate, q).unwrap_err();
        assert_eq!(
            err,
            GenerateError::invalid("CTE 'PersonCte' binds 1 attributes but its body produces 2 values")
        );
    }

    #[test]
    fn cte_body_cannot_be_limited() {
        let q = documents_with(Cte::new(
            "PersonCte",
            vec!["id", "name"],
            active_people().limit(10),
        ));
        let err = render(Dialect::Hibernate, q).unwrap_err();
        assert_eq!(err, GenerateError::invalid("CTE 'PersonCte' cannot limit its body"));
    }

    #[test]
    fn cte_set_operation_member_cannot_be_limited() {
        let body = QueryBuilder::from(active_people().limit(1)).union(active_people());
        let q = documents_with(Cte::new("PersonCte", vec!["id", "name"], body));
        let err = render(Dialect::Hibernate, q).unwrap_err();
        assert_eq!(err, GenerateError::invalid("CTE 'PersonCte' cannot limit its body"));
    }

    #[test]
    fn recursive_cte() {
        let anchor = SelectQuery::from_entity("Category", "cat")
            .select(path("cat.id"))
            .filter(path("cat.parent").is_null());
        let step = SelectQuery::from_entity("Category", "child")
            .select(path("child.id"))
            .filter(path("child.parent.id").eq(1));
        let cte = Cte::recursive("Tree", vec!["id"], QueryBuilder::from(anchor).union_all(step));
        let q = SelectQuery::from_entity("Tree", "t")
            .with_cte(cte)
            .select(path("t.id"));

        let sql = render(Dialect::Hibernate, q).unwrap().text;
        assert_snapshot!(sql, @"WITH RECURSIVE Tree(id) AS(SELECT cat.id FROM Category cat WHERE cat.parent IS NULL UNION ALL SELECT child.id FROM Category child WHERE child.parent.id = 1) SELECT t.id FROM Tree t");
    }

    #[test]
    fn cte_with_modification_body() {
        let update = UpdateQuery::new("Document", "d")
            .set("d.archived", true)
            .filter(path("d.age").gt(param("age")))
            .returning(vec!["d.id"]);
        let q = SelectQuery::from_entity("Archived", "a")
            .with_cte(Cte::new("Archived", vec!["id"], update))
            .select(path("a.id"));

        let rendered = render(Dialect::Hibernate, q).unwrap();
        assert_snapshot!(rendered.text, @"WITH Archived(id) AS(UPDATE Document d SET d.archived = true WHERE d.age > :age RETURNING d.id) SELECT a.id FROM Archived a");
        assert_eq!(rendered.parameters, vec!["age"]);
    }

    #[test]
    fn cte_with_delete_collection_body() {
        let delete = DeleteCollectionQuery::new("Document", "d", "people").returning(vec!["d.id"]);
        let q = SelectQuery::from_entity("Removed", "r")
            .with_cte(Cte::new("Removed", vec!["id"], delete));
        let sql = render(Dialect::Hibernate, q.clone()).unwrap().text;
        assert_snapshot!(sql, @"WITH Removed(id) AS(DELETE FROM Document(people) d RETURNING d.id) SELECT r FROM Removed r");

        assert!(matches!(
            Statement::from(q).copy().unwrap_err(),
            GenerateError::UnsupportedForVariant { .. }
        ));
    }

    // ------------------------------------------------------------------------
    // Parameters and documents
    // ------------------------------------------------------------------------

    #[test]
    fn parameters_in_first_occurrence_order() {
        let owners = SelectQuery::from_entity("Person", "p")
            .select(path("p.id"))
            .filter(path("p.name").eq(param("name")));
        let q = SelectQuery::from_entity("Document", "d")
            .select(param("label"))
            .filter(
                path("d.id")
                    .eq(param("id"))
                    .and(path("d.owner.id").in_list(vec![Expr::from(owners)]))
                    .and(path("d.age").gt(param("id"))),
            );
        let rendered = render(Dialect::Hibernate, q).unwrap();
        assert_eq!(rendered.parameters, vec!["label", "id", "name"]);
    }

    #[test]
    fn json_document_renders_like_builder() {
        let statement = Statement::from(
            DeleteQuery::new("Document", "d")
                .filter(path("d.name").like_escape(lit_str("a!%"), '!')),
        );
        let json = serde_json::to_string(&statement).unwrap();
        let loaded: Statement = serde_json::from_str(&json).unwrap();

        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(Dialect::DataNucleus.provider(), &functions);
        let rendered = loaded.render(&ctx).unwrap();
        assert_eq!(rendered, statement.render(&ctx).unwrap());
        assert_snapshot!(rendered.text, @"DELETE FROM Document d WHERE d.name LIKE 'a!%' ESCAPE '!'");
    }
}
