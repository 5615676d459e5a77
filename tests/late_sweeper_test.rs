// ==========================================
// 超时扫描集成测试
// ==========================================


#[cfg(test)]
mod late_sweeper_test {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::test_helpers::{
        build_test_env, reactor_turn_on, submit, RecordingBus, T0, USER_CTEEP, USER_ONS,
    };
    use voltage_control::app::{LateSweeper, SweepOutcome};
    use voltage_control::db::open_sqlite_connection;
    use voltage_control::{ApiError, SolicitationStatus};

    #[tokio::test]
    async fn test_mark_late_is_idempotent() {
        let bus = Arc::new(RecordingBus::default());
        let env = build_test_env(bus.clone());
        let api = &env.state.solicitation_api;

        let ids = submit(
            &env,
            vec![reactor_turn_on("CTEEP", "MOS"), reactor_turn_on("CTEEP", "PIR")],
        )
        .await;
        api.change_status(ids[0], USER_CTEEP, "ACCEPTED", None).await.unwrap();

        // 恰好等于 late_after 时不标记
        env.clock.advance(300);
        assert!(api.mark_late_accepted().unwrap().is_empty());

        env.clock.advance(1);
        assert_eq!(api.mark_late_accepted().unwrap(), vec![ids[0]]);
        assert!(api.mark_late_accepted().unwrap().is_empty());

        let view = api.get_solicitation("ONS", ids[0]).unwrap();
        assert_eq!(view.status, SolicitationStatus::Late);
        let late_events: Vec<_> = view
            .events
            .iter()
            .filter(|e| e.status == SolicitationStatus::Late)
            .collect();
        assert_eq!(late_events.len(), 1);
        assert_eq!(late_events[0].actor, None);
        assert_eq!(late_events[0].time_stamp, T0 + 301);

        // 仍为 NEW 的申请不受影响
        let other = api.get_solicitation("ONS", ids[1]).unwrap();
        assert_eq!(other.status, SolicitationStatus::New);

        // 标记通知为广播
        let last = bus.published().last().cloned().unwrap();
        assert_eq!(last.recipients, None);
    }

    #[tokio::test]
    async fn test_late_can_still_be_executed() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let api = &env.state.solicitation_api;
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;

        api.change_status(ids[0], USER_CTEEP, "ACCEPTED", None).await.unwrap();
        env.clock.advance(600);
        api.mark_late_accepted().unwrap();

        let err = api.change_status(ids[0], USER_ONS, "ACCEPTED", None).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        let executed = api.change_status(ids[0], USER_CTEEP, "EXECUTED", None).await.unwrap();
        assert_eq!(executed.status, SolicitationStatus::Executed);
    }

    #[tokio::test]
    async fn test_run_once_reports_marked_ids() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let api = env.state.solicitation_api.clone();
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;
        api.change_status(ids[0], USER_CTEEP, "ACCEPTED", None).await.unwrap();

        let sweeper = LateSweeper::new(api, Duration::from_secs(60));
        assert_eq!(sweeper.run_once().await, SweepOutcome::Completed { marked: vec![] });

        env.clock.advance(400);
        assert_eq!(
            sweeper.run_once().await,
            SweepOutcome::Completed { marked: vec![ids[0]] }
        );
    }

    #[tokio::test]
    async fn test_spawned_sweeper_marks_and_stops() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let api = env.state.solicitation_api.clone();
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;
        api.change_status(ids[0], USER_CTEEP, "ACCEPTED", None).await.unwrap();
        env.clock.advance(400);

        // 首个 tick 立即触发
        let handle = LateSweeper::new(api.clone(), Duration::from_millis(20)).spawn();

        let mut status = SolicitationStatus::Accepted;
        for _ in 0..50 {
            status = api.get_solicitation("ONS", ids[0]).unwrap().status;
            if status == SolicitationStatus::Late {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.stop().await;

        assert_eq!(status, SolicitationStatus::Late);
        let view = api.get_solicitation("ONS", ids[0]).unwrap();
        assert_eq!(
            view.events
                .iter()
                .filter(|e| e.status == SolicitationStatus::Late)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_store_failure_aborts_sweep() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let api = env.state.solicitation_api.clone();
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;
        api.change_status(ids[0], USER_CTEEP, "ACCEPTED", None).await.unwrap();

        // 另一连接损坏初始事件, 头事件仍为 ACCEPTED
        let conn = open_sqlite_connection(&env.state.db_path).unwrap();
        conn.execute(
            "UPDATE solicitation_event SET status = 'BOGUS' WHERE solicitation_id = ?1 AND status = 'NEW'",
            [ids[0]],
        )
        .unwrap();
        env.clock.advance(400);

        let err = api.mark_late_accepted().unwrap_err();
        assert!(matches!(err, ApiError::Store(_)));
        assert_eq!(err.status_code(), 500);

        let sweeper = LateSweeper::new(api, Duration::from_secs(60));
        assert!(matches!(sweeper.run_once().await, SweepOutcome::Failed { .. }));

        // 未写入 LATE 事件
        let late: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM solicitation_event WHERE solicitation_id = ?1 AND status = 'LATE'",
                [ids[0]],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(late, 0);
    }

    #[tokio::test]
    async fn test_sweep_ignores_solicitations_moved_on() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let api = &env.state.solicitation_api;
        let ids = submit(
            &env,
            vec![reactor_turn_on("CTEEP", "MOS"), reactor_turn_on("CTEEP", "PIR")],
        )
        .await;
        for id in &ids {
            api.change_status(*id, USER_CTEEP, "ACCEPTED", None).await.unwrap();
        }
        env.clock.advance(400);

        // 第一个在扫描前已执行, 只标记第二个
        api.change_status(ids[0], USER_CTEEP, "EXECUTED", None).await.unwrap();
        env.clock.advance(1);
        assert_eq!(api.mark_late_accepted().unwrap(), vec![ids[1]]);
    }
}
