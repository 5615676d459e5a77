// ==========================================
// 并发状态变更测试
// ==========================================
// 同一申请的并发迁移只能有一个基于同一头事件成功
// ==========================================


#[cfg(test)]
mod concurrent_status_test {
    use std::sync::Arc;

    use crate::test_helpers::{
        build_test_env, reactor_turn_on, submit, RecordingBus, USER_CTEEP, USER_ONS,
    };
    use voltage_control::api::error::ConflictKind;
    use voltage_control::domain::UpdateKind;
    use voltage_control::SolicitationStatus;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts_only_one_succeeds() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;
        let id = ids[0];

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let api = env.state.solicitation_api.clone();
            tasks.push(tokio::spawn(async move {
                api.change_status(id, USER_CTEEP, "ACCEPTED", None).await
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(response) => {
                    assert_eq!(response.status, SolicitationStatus::Accepted);
                    succeeded += 1;
                }
                Err(e) => {
                    // 后到者看到的是已受理 (无变化) 或并发冲突
                    assert!(matches!(
                        e.conflict_kind(),
                        Some(ConflictKind::NoOp) | Some(ConflictKind::Concurrent)
                    ));
                }
            }
        }
        assert_eq!(succeeded, 1);

        let view = env.state.solicitation_api.get_solicitation("ONS", id).unwrap();
        assert_eq!(view.status, SolicitationStatus::Accepted);
        assert_eq!(view.events.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_targets_leave_one_head() {
        let env = build_test_env(Arc::new(RecordingBus::default()));
        let ids = submit(&env, vec![reactor_turn_on("CTEEP", "MOS")]).await;
        let id = ids[0];

        let mut tasks = Vec::new();
        for target in ["ACCEPTED", "CONTESTED", "BLOCKED"] {
            let api = env.state.solicitation_api.clone();
            tasks.push(tokio::spawn(async move {
                api.change_status(id, USER_CTEEP, target, None).await
            }));
        }

        let mut applied = Vec::new();
        for task in tasks {
            if let Ok(response) = task.await.unwrap() {
                applied.push(response.status);
            }
        }
        assert!(!applied.is_empty());

        // 当前状态等于最后一次成功写入, 事件数 = 1 + 成功次数
        let view = env.state.solicitation_api.get_solicitation("ONS", id).unwrap();
        assert_eq!(view.events.len(), 1 + applied.len());
        assert!(applied.contains(&view.status));

        // 更新流中的 previous_status 必须是实际迁移前的状态
        let api = &env.state.solicitation_api;
        let token = api.current_stream_token().unwrap();
        let changes: Vec<_> = api
            .updates_since(USER_ONS, 0, token)
            .await
            .unwrap()
            .into_iter()
            .filter(|u| u.kind == UpdateKind::StatusChanged)
            .collect();
        assert_eq!(changes.len(), applied.len());

        // 事件由旧到新
        let chain: Vec<&str> = view.events.iter().rev().map(|e| e.status.as_str()).collect();
        for change in &changes {
            let status = change.content["status"].as_str().unwrap();
            let previous = change.content["previous_status"].as_str().unwrap();
            let pos = chain.iter().position(|s| *s == status).unwrap();
            assert_eq!(chain[pos - 1], previous, "status {} moved from {}", status, previous);
        }
    }
}
