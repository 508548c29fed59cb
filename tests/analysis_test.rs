// tests/analysis_test.rs
#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use querygen::prelude::*;

    fn render(dialect: Dialect, query: SelectQuery) -> String {
        let functions = FunctionRegistry::new();
        let ctx = RenderContext::new(dialect.provider(), &functions);
        QueryBuilder::from(query).render(&ctx).unwrap().text
    }

    fn transformed(mut query: SelectQuery) -> SelectQuery {
        SizeTransformer::new().transform(&mut query).unwrap();
        query
    }

    #[test]
    fn size_in_select_becomes_count_join() {
        let q = transformed(
            SelectQuery::from_entity("Document", "d")
                .select(path("d.name"))
                .select(size(path("d.people"))),
        );
        assert_snapshot!(render(Dialect::Hibernate, q), @"SELECT d.name, COUNT(d_people) FROM Document d LEFT JOIN d.people d_people GROUP BY d.name");
    }

    #[test]
    fn size_in_where_becomes_subquery() {
        let q = transformed(
            SelectQuery::from_entity("Document", "d").filter(size(path("d.people")).gt(2)),
        );
        assert_snapshot!(render(Dialect::Hibernate, q.clone()), @"SELECT d FROM Document d WHERE (SELECT COUNT(*) FROM d.people d_people) > 2");
        assert_snapshot!(render(Dialect::EclipseLink, q), @"SELECT d FROM Document d WHERE (SELECT FUNCTION('COUNT_STAR') FROM d.people d_people) > 2");
    }

    #[test]
    fn distinct_query_uses_subquery() {
        let q = transformed(
            SelectQuery::from_entity("Document", "d")
                .distinct()
                .select(path("d.name"))
                .select(size(path("d.people"))),
        );
        assert!(q.group_by.is_empty());
        assert_snapshot!(render(Dialect::Hibernate, q), @"SELECT DISTINCT d.name, (SELECT COUNT(*) FROM d.people d_people) FROM Document d");
    }

    #[test]
    fn explicit_collection_join_uses_subquery() {
        let mut q = SelectQuery::from_entity("Document", "d");
        q.left_join("d.contacts", "c", RelationKind::Collection).unwrap();
        let q = transformed(q.select(path("c.name")).select(size(path("d.people"))));
        assert_snapshot!(render(Dialect::Hibernate, q), @"SELECT c.name, (SELECT COUNT(*) FROM d.people d_people) FROM Document d LEFT JOIN d.contacts c");
    }

    #[test]
    fn size_in_order_by() {
        let q = transformed(
            SelectQuery::from_entity("Document", "d")
                .select(path("d.name"))
                .order_by(vec![OrderByItem::desc(size(path("d.people")))]),
        );
        assert_snapshot!(render(Dialect::Hibernate, q), @"SELECT d.name FROM Document d LEFT JOIN d.people d_people GROUP BY d.name ORDER BY COUNT(d_people) DESC");
    }

    #[test]
    fn implicit_group_by_for_aggregates() {
        let mut q = SelectQuery::from_entity("Document", "d")
            .select(path("d.name"))
            .select(path("d.age"))
            .select(count(path("d.id")))
            .group_by(vec![path("d.name")]);
        assert_eq!(implicit_group_by(&q), vec![path("d.age")]);

        apply_implicit_group_by(&mut q);
        assert_snapshot!(render(Dialect::OpenJpa, q), @"SELECT d.name, d.age, COUNT(d.id) FROM Document d GROUP BY d.name, d.age");
    }

    #[test]
    fn group_by_detection_per_clause() {
        let size_expr = size(path("d.people"));
        for (clause, expected) in [
            (ClauseType::Select, true),
            (ClauseType::Where, false),
            (ClauseType::GroupBy, false),
            (ClauseType::Having, true),
            (ClauseType::OrderBy, true),
            (ClauseType::Join, false),
        ] {
            assert_eq!(
                GroupByUsableDetection::for_clause(clause).visit(&size_expr),
                expected,
                "{:?}",
                clause
            );
        }
    }
}
